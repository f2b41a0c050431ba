use crate::url::extract_id;

/// Identifier used for the very first checkpoint request
pub const FIRST_ID: &str = "0";

/// Where the next stage starts from
///
/// Only the stage loop mutates this, once per iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    /// Stage index being resolved
    pub stage: u32,

    /// Current checkpoint or challenge URL
    pub url: String,

    /// Last path segment of the previous hop
    pub id: String,
}

impl StageContext {
    /// Context for stage 0 at the entry URL
    pub fn new(entry_url: impl Into<String>) -> Self {
        Self {
            stage: 0,
            url: entry_url.into(),
            id: FIRST_ID.to_string(),
        }
    }

    /// Moves to the next stage at `url`, deriving the identifier from it
    pub fn advance(&mut self, url: String) {
        self.id = extract_id(&url);
        self.url = url;
        self.stage = self.stage.saturating_add(1);
    }
}
