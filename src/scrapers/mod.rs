//! Source parsers turning fetched text into [`crate::models::CandidateItem`]s.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | YouTube channel / uploads | [`syndication`] | Atom | Short links rewritten to watch pages |
//! | Bandcamp feed | [`syndication`] | RSS/Atom | Only when the artist exposes `/feed` |
//! | Bandcamp catalog | [`catalog`] | HTML scraping | Capped, staggered detail fetches for dates |
//! | Press feeds | [`syndication`] | RSS | Relevance-filtered |
//! | Google News search | [`syndication`] | RSS | Relevance-filtered; `<source>` names the outlet |
//!
//! # Common Patterns
//!
//! Parsers never fail: anything they cannot make sense of is dropped at the
//! smallest possible granularity (one unit, one tile), logged at debug level,
//! and the rest of the document is still returned.

pub mod catalog;
pub mod syndication;
