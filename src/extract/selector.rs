//! CSS selector based extraction
//!
//! The progress indicator is the n-th element matching a selector whose text
//! reads `"<current>/<total>"`. The key lives in a single display element.

use crate::config::CheckpointConfig;
use crate::extract::{KeyExtractor, Progress};
use crate::ConfigError;
use scraper::{Html, Selector};

/// Selector matching the progress indicator candidates on checkpoint pages
pub const DEFAULT_PROGRESS_SELECTOR: &str =
    ".flex.justify-between.text-sm.font-medium.text-gray-300 span";

/// Selector of the key display element
pub const DEFAULT_KEY_SELECTOR: &str = "#key-display";

/// Extractor driven by configurable CSS selectors
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    progress: Selector,
    progress_index: usize,
    key: Selector,
}

impl SelectorExtractor {
    /// Builds an extractor from CSS selector strings
    ///
    /// # Arguments
    ///
    /// * `progress_css` - Selector matching progress indicator candidates
    /// * `progress_index` - Zero-based index of the match holding the progress text
    /// * `key_css` - Selector of the key display element
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorExtractor)` - Both selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector failed to parse
    pub fn new(
        progress_css: &str,
        progress_index: usize,
        key_css: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            progress: parse_selector(progress_css)?,
            progress_index,
            key: parse_selector(key_css)?,
        })
    }

    /// Builds an extractor from the checkpoint section of the configuration
    pub fn from_config(config: &CheckpointConfig) -> Result<Self, ConfigError> {
        Self::new(
            &config.progress_selector,
            config.progress_index,
            &config.key_selector,
        )
    }

    fn key_in(&self, document: &Html) -> Option<String> {
        document
            .select(&self.key)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl KeyExtractor for SelectorExtractor {
    fn extract_progress(&self, html: &str) -> Progress {
        let document = Html::parse_document(html);

        let text = document
            .select(&self.progress)
            .nth(self.progress_index)
            .map(|element| element.text().collect::<String>())
            .unwrap_or_default();

        let (current_stage, total_stages) = parse_progress_text(&text);

        Progress {
            current_stage,
            total_stages,
            key: self.key_in(&document),
        }
    }

    fn extract_key(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        self.key_in(&document)
    }
}

fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", css, e)))
}

/// Parses `"<current>/<total>"`, defaulting the current stage to 0
///
/// Each side is read up to its first non-digit, so `"2 of 3/5"` is stage 2.
/// Negative numbers clamp to 0.
fn parse_progress_text(text: &str) -> (u32, Option<u32>) {
    let mut parts = text.splitn(2, '/');
    let current = parts.next().and_then(leading_int).unwrap_or(0);
    let total = parts.next().and_then(leading_int);
    (current, total)
}

fn leading_int(text: &str) -> Option<u32> {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits[..end].parse::<u32>().unwrap_or(u32::MAX))
}
