//! Relevance gate for press and news-search items.
//!
//! Video-platform and marketplace items never pass through here; their
//! provenance already ties them to the subject. Everything else is judged on
//! the concatenation of title and excerpt, case-insensitively, with rules
//! evaluated strictly in this order:
//!
//! 1. the subject must appear as a whole word
//! 2. a homograph (same-spelled unrelated name) as a whole word vetoes
//! 3. any block term as a substring vetoes
//! 4. any context term as a substring accepts
//! 5. a trusted publication host accepts
//! 6. otherwise reject
//!
//! Block terms are checked before context terms, so an item mentioning both
//! is rejected.

use regex::Regex;
use std::fmt;

use crate::config::Config;
use crate::models::CandidateItem;
use crate::utils::host_of;

/// Which rule decided an item, with the term that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    MissingSubject,
    Homograph(String),
    Blocked(String),
    Context(String),
    TrustedHost(String),
    NoContext,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Context(_) | Verdict::TrustedHost(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::MissingSubject => write!(f, "rejected: subject not mentioned"),
            Verdict::Homograph(t) => write!(f, "rejected: homograph '{t}'"),
            Verdict::Blocked(t) => write!(f, "rejected: block term '{t}'"),
            Verdict::Context(t) => write!(f, "accepted: context term '{t}'"),
            Verdict::TrustedHost(h) => write!(f, "accepted: trusted host '{h}'"),
            Verdict::NoContext => write!(f, "rejected: no context term or trusted host"),
        }
    }
}

/// Compiled relevance rules.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    subject: Regex,
    homographs: Option<Regex>,
    block_terms: Vec<String>,
    context_terms: Vec<String>,
    trusted_hosts: Vec<String>,
}

fn lowered(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn whole_word_alternation(terms: &[String]) -> Result<Option<Regex>, regex::Error> {
    let escaped: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if escaped.is_empty() {
        return Ok(None);
    }
    Regex::new(&format!(r"(?i)\b(?:{})\b", escaped.join("|"))).map(Some)
}

impl RelevanceFilter {
    pub fn from_config(config: &Config) -> Result<Self, regex::Error> {
        let subject = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(config.subject.trim())))?;
        Ok(Self {
            subject,
            homographs: whole_word_alternation(&config.homographs)?,
            block_terms: lowered(&config.block_terms),
            context_terms: lowered(&config.context_terms),
            trusted_hosts: lowered(&config.trusted_hosts)
                .into_iter()
                .map(|h| h.trim_start_matches("www.").to_string())
                .collect(),
        })
    }

    /// Decide whether `item` is about the subject.
    pub fn evaluate(&self, item: &CandidateItem) -> Verdict {
        let text = item.text();

        if !self.subject.is_match(&text) {
            return Verdict::MissingSubject;
        }
        if let Some(m) = self.homographs.as_ref().and_then(|re| re.find(&text)) {
            return Verdict::Homograph(m.as_str().to_lowercase());
        }

        let lower = text.to_lowercase();
        if let Some(term) = self.block_terms.iter().find(|t| lower.contains(t.as_str())) {
            return Verdict::Blocked(term.clone());
        }
        if let Some(term) = self.context_terms.iter().find(|t| lower.contains(t.as_str())) {
            return Verdict::Context(term.clone());
        }

        let host = item
            .publisher_url
            .as_deref()
            .and_then(host_of)
            .or_else(|| host_of(&item.url));
        if let Some(host) = host {
            if self.is_trusted_host(&host) {
                return Verdict::TrustedHost(host);
            }
        }

        Verdict::NoContext
    }

    /// Exact match or subdomain of an allowlisted host.
    fn is_trusted_host(&self, host: &str) -> bool {
        self.trusted_hosts
            .iter()
            .any(|t| host == t || host.ends_with(&format!(".{t}")))
    }
}
