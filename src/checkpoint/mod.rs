//! Checkpoint service client
//!
//! This module wraps the two requests the checkpoint service understands:
//! - GET a checkpoint page to read the stage progress and any key
//! - POST the stage identifier and proof token to learn the next hop

mod resolver;

pub use resolver::CheckpointResolver;

/// Result of resolving one checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Stage reported by the checkpoint page
    pub current_stage: u32,

    /// Next hop from the `Location` header; `None` means the chain is exhausted
    pub next_url: Option<String>,

    /// Key shown on the checkpoint page
    pub key: Option<String>,
}
