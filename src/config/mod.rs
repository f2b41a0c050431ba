//! Configuration module for Checkpoint-Walker
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; omitted keys take the built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use checkpoint_walker::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("walker.toml")).unwrap();
//! println!("Walker will try up to stage {}", config.checkpoint.max_stage);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BypassConfig, CheckpointConfig, Config, NetworkConfig, RetryConfig, SolverConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, MAX_STAGE_LIMIT};
