//! URL handling module for Checkpoint-Walker
//!
//! This module turns loosely-shaped bypass payloads into a single URL and
//! derives the checkpoint identifier from a URL.

mod normalize;
mod segment;

// Re-export main functions
pub use normalize::{normalize_payload, Payload};
pub use segment::extract_id;
