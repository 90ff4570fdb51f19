//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: writes the ranked record set and the diagnostics snapshot
//!
//! # Output Structure
//!
//! ```text
//! data/
//! ├── news.json              # NewsRecord array, replaced every run
//! └── news.diagnostics.json  # optional per-source counts and a sample
//! ```

pub mod json;
