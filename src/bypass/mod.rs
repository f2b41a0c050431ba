//! Bypass service client
//!
//! This module contains:
//! - Starting a bypass for a challenge URL
//! - Polling long-lived bypass tasks to completion
//! - Speculative key extraction from result pages

mod poller;
mod types;

pub use poller::{BypassPoller, PollSettings};
pub use types::{BypassResult, PollTask, TaskStatus};
