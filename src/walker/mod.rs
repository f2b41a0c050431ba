//! Walker module for the checkpoint chain
//!
//! This module contains the orchestration logic, including:
//! - HTTP client construction for both services
//! - The stage loop state machine

mod client;
mod stage_loop;

pub use client::build_http_client;
pub use stage_loop::{ExhaustReason, KeySource, LoopSettings, Outcome, StageFailure, StageLoop};

use crate::config::Config;
use crate::retry::TokioSleeper;
use crate::solver::TokenSolver;
use crate::ConfigError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete walk
///
/// This is the main entry point for a walk. It will:
/// 1. Build the HTTP clients and extractor from the configuration
/// 2. Walk stages from 0 until a key is found or the chain runs out
///
/// # Returns
///
/// * `Ok(Ok(Outcome))` - The walk ended with a key or exhausted the chain
/// * `Ok(Err(StageFailure))` - A stage failed
/// * `Err(ConfigError)` - The walker could not be built
pub async fn walk(
    config: &Config,
    solver: Arc<dyn TokenSolver>,
    cancel: &CancellationToken,
) -> Result<Result<Outcome, StageFailure>, ConfigError> {
    let stage_loop = StageLoop::from_config(config, solver, Arc::new(TokioSleeper))?;
    Ok(stage_loop.run(cancel).await)
}
