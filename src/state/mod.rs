//! State module for tracking walk progress
//!
//! # Components
//!
//! - `RunState`: Lifecycle of one walk (stage loop, key found, exhausted, failed)
//! - `StageContext`: The URL and identifier the next stage starts from

mod context;
mod run_state;

// Re-export main types
pub use context::StageContext;
pub use run_state::RunState;
