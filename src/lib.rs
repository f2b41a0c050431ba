//! Checkpoint-Walker: walks a captcha-gated checkpoint chain until it yields a key
//!
//! This crate drives repeated checkpoint requests against a checkpoint service,
//! hands each next hop to an asynchronous bypass service, normalizes whatever
//! payload comes back into a URL, and stops once a terminal key is found or the
//! chain runs out.

pub mod bypass;
pub mod checkpoint;
pub mod config;
pub mod extract;
pub mod retry;
pub mod solver;
pub mod state;
pub mod url;
pub mod walker;

use thiserror::Error;

/// Main error type for checkpoint walking operations
#[derive(Debug, Error)]
pub enum WalkerError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Checkpoint identifier is missing")]
    MissingIdentifier,

    #[error("URL is required")]
    MissingUrl,

    #[error("Proof token is required")]
    MissingProofToken,

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Bypass start failed: {status} {body}")]
    BypassStart { status: u16, body: String },

    #[error("Bypass start returned a long-lived token without a task id")]
    MissingTaskId,

    #[error("Bypass task {task_id} failed: {status_payload}")]
    BypassTaskFailed {
        task_id: String,
        status_payload: serde_json::Value,
    },

    #[error("Timed out waiting for bypass task {task_id}")]
    BypassTimeout { task_id: String },

    #[error("Failed to parse URL from bypass payload: {payload}")]
    Normalization { payload: serde_json::Value },

    #[error("Token solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Run was cancelled")]
    Cancelled,
}

impl WalkerError {
    /// Returns true if retrying the same request may succeed
    ///
    /// Only transport failures (timeouts, refused connections) and HTTP status
    /// failures count as transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to load credentials from {path}: {reason}")]
    Credentials { path: String, reason: String },
}

/// Errors reported by the captcha token solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Solver API error {code}: {description}")]
    Api { code: String, description: String },

    #[error("Solver task {task_id} did not finish in time")]
    Timeout { task_id: String },

    #[error("Solver response had no token")]
    MissingToken,
}

/// Result type alias for checkpoint walking operations
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use bypass::{BypassPoller, BypassResult};
pub use checkpoint::{Checkpoint, CheckpointResolver};
pub use config::Config;
pub use extract::{KeyExtractor, Progress, SelectorExtractor};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use solver::TokenSolver;
pub use state::{RunState, StageContext};
pub use crate::url::{extract_id, normalize_payload, Payload};
pub use walker::{Outcome, StageFailure, StageLoop};
