//! Key and progress extraction from checkpoint pages
//!
//! Orchestration code only talks to the [`KeyExtractor`] trait, so the
//! scraping strategy can change without touching the stage loop.

mod selector;

pub use selector::{SelectorExtractor, DEFAULT_KEY_SELECTOR, DEFAULT_PROGRESS_SELECTOR};

/// Progress reported by a checkpoint page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// Stage number before the `/` in the progress indicator (0 if unparsable)
    pub current_stage: u32,

    /// Stage count after the `/`, when present and numeric
    pub total_stages: Option<u32>,

    /// Key shown on the page, if any
    pub key: Option<String>,
}

/// Extracts progress and keys from HTML documents
///
/// Implementations never fail: malformed or key-less documents produce
/// default progress and `None` keys.
pub trait KeyExtractor: Send + Sync {
    /// Reads the progress indicator and optional key from a checkpoint page
    fn extract_progress(&self, html: &str) -> Progress;

    /// Reads the key from a result page
    fn extract_key(&self, html: &str) -> Option<String>;
}
