//! Stage loop - the checkpoint chain orchestration
//!
//! Each iteration:
//! 1. Solve a proof token for the checkpoint site key
//! 2. Resolve the current checkpoint; stop on a key, stop if there is no next hop
//! 3. Solve a proof token for the bypass site key
//! 4. Bypass the next hop; stop on a key
//! 5. Continue from the normalized bypass URL
//!
//! Any error aborts the run. Nothing is retried across stages.

use crate::bypass::{BypassPoller, PollSettings};
use crate::checkpoint::CheckpointResolver;
use crate::config::Config;
use crate::extract::{KeyExtractor, SelectorExtractor};
use crate::retry::{until_cancelled, RetryPolicy, Sleeper};
use crate::solver::TokenSolver;
use crate::state::{RunState, StageContext};
use crate::walker::build_http_client;
use crate::{ConfigError, WalkerError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Where a key was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Shown on a checkpoint page
    Checkpoint,
    /// Shown on the result page a bypass resolved to
    BypassResult,
}

/// Why a run ended without a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The checkpoint returned no next hop
    NoNextUrl,
    /// Every stage up to the configured maximum was walked
    StagesDepleted,
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNextUrl => write!(f, "no next URL"),
            Self::StagesDepleted => write!(f, "all stages walked"),
        }
    }
}

/// Terminal result of a run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    KeyFound {
        stage: u32,
        key: String,
        source: KeySource,
    },
    Exhausted {
        stage: u32,
        reason: ExhaustReason,
    },
}

impl Outcome {
    pub fn state(&self) -> RunState {
        match self {
            Self::KeyFound { .. } => RunState::KeyFound,
            Self::Exhausted { .. } => RunState::Exhausted,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::KeyFound { key, .. } => Some(key),
            Self::Exhausted { .. } => None,
        }
    }
}

/// A run that aborted, with the stage it aborted in
#[derive(Debug, Error)]
#[error("Stage {stage} failed at {url}: {source}")]
pub struct StageFailure {
    pub stage: u32,
    pub url: String,
    #[source]
    pub source: WalkerError,
}

impl StageFailure {
    pub fn state(&self) -> RunState {
        RunState::Failed
    }
}

/// Pages and limits the loop works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    /// Highest stage index attempted (inclusive)
    pub max_stage: u32,
    /// First checkpoint URL, also the page the checkpoint captcha is solved for
    pub entry_url: String,
    pub checkpoint_site_key: String,
    /// Page the bypass captcha is solved for
    pub bypass_page_url: String,
    pub bypass_site_key: String,
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_stage: config.checkpoint.max_stage,
            entry_url: config.checkpoint.entry_url(),
            checkpoint_site_key: config.checkpoint.site_key.clone(),
            bypass_page_url: config.bypass.page_url(),
            bypass_site_key: config.bypass.site_key.clone(),
        }
    }
}

enum Step {
    Key(String, KeySource),
    NoNextUrl,
    Next(String),
}

/// Drives the checkpoint chain from stage 0 to a terminal state
pub struct StageLoop {
    solver: Arc<dyn TokenSolver>,
    resolver: CheckpointResolver,
    poller: BypassPoller,
    settings: LoopSettings,
}

impl StageLoop {
    pub fn new(
        solver: Arc<dyn TokenSolver>,
        resolver: CheckpointResolver,
        poller: BypassPoller,
        settings: LoopSettings,
    ) -> Self {
        Self {
            solver,
            resolver,
            poller,
            settings,
        }
    }

    /// Wires up resolver, poller and HTTP clients from the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(StageLoop)` - Ready to run
    /// * `Err(ConfigError)` - A selector failed to parse or a client failed to build
    pub fn from_config(
        config: &Config,
        solver: Arc<dyn TokenSolver>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, ConfigError> {
        let extractor: Arc<dyn KeyExtractor> =
            Arc::new(SelectorExtractor::from_config(&config.checkpoint)?);

        let resolver = CheckpointResolver::new(
            build_http_client(&config.network, false)?,
            extractor.clone(),
            RetryPolicy::from(&config.network.retry),
            sleeper.clone(),
            config.checkpoint.proof_field.clone(),
        );

        let poller = BypassPoller::new(
            build_http_client(&config.network, true)?,
            config.bypass.api_host.clone(),
            config.bypass.captcha_provider.clone(),
            config.checkpoint.result_prefix(),
            PollSettings::from(&config.bypass),
            extractor,
            sleeper,
        );

        Ok(Self::new(solver, resolver, poller, LoopSettings::from(config)))
    }

    /// Walks the chain until a key is found, the chain runs out, or a stage fails
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Outcome, StageFailure> {
        let mut ctx = StageContext::new(self.settings.entry_url.clone());

        while ctx.stage <= self.settings.max_stage {
            tracing::info!("--- Stage {} ---", ctx.stage);

            match self.step(&ctx, cancel).await {
                Ok(Step::Key(key, source)) => {
                    tracing::info!("Key obtained at stage {} ({:?})", ctx.stage, source);
                    return Ok(Outcome::KeyFound {
                        stage: ctx.stage,
                        key,
                        source,
                    });
                }
                Ok(Step::NoNextUrl) => {
                    tracing::warn!("No next URL provided at stage {}; stopping", ctx.stage);
                    return Ok(Outcome::Exhausted {
                        stage: ctx.stage,
                        reason: ExhaustReason::NoNextUrl,
                    });
                }
                Ok(Step::Next(url)) => ctx.advance(url),
                Err(source) => {
                    tracing::error!("Stage {} failed at {}: {}", ctx.stage, ctx.url, source);
                    return Err(StageFailure {
                        stage: ctx.stage,
                        url: ctx.url,
                        source,
                    });
                }
            }
        }

        tracing::warn!("Completed loop without acquiring key");
        Ok(Outcome::Exhausted {
            stage: self.settings.max_stage,
            reason: ExhaustReason::StagesDepleted,
        })
    }

    async fn step(&self, ctx: &StageContext, cancel: &CancellationToken) -> Result<Step, WalkerError> {
        let token = self
            .solve(&self.settings.entry_url, &self.settings.checkpoint_site_key, cancel)
            .await?;

        let checkpoint = self
            .resolver
            .next_checkpoint(Some(&ctx.url), Some(&ctx.id), &token, cancel)
            .await?;
        tracing::info!(
            "Checkpoint: current_stage={} next={:?}",
            checkpoint.current_stage,
            checkpoint.next_url
        );

        if let Some(key) = checkpoint.key {
            return Ok(Step::Key(key, KeySource::Checkpoint));
        }

        let Some(next_url) = checkpoint.next_url else {
            return Ok(Step::NoNextUrl);
        };

        let token = self
            .solve(&self.settings.bypass_page_url, &self.settings.bypass_site_key, cancel)
            .await?;

        let result = self.poller.bypass(&next_url, &token, cancel).await?;

        if let Some(key) = result.key {
            return Ok(Step::Key(key, KeySource::BypassResult));
        }

        let url = match result.resolved_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                return Err(WalkerError::Normalization {
                    payload: result.raw_payload,
                })
            }
        };

        tracing::info!(
            "Bypassed URL: {} (long-lived: {}, task: {:?})",
            url,
            result.is_async_task,
            result.task_id
        );
        Ok(Step::Next(url))
    }

    async fn solve(
        &self,
        page_url: &str,
        site_key: &str,
        cancel: &CancellationToken,
    ) -> Result<String, WalkerError> {
        let token = until_cancelled(cancel, async {
            self.solver
                .solve_challenge(page_url, site_key)
                .await
                .map_err(WalkerError::from)
        })
        .await?;

        tracing::debug!(
            "Proof token for {}: {}...",
            page_url,
            token.chars().take(12).collect::<String>()
        );
        Ok(token)
    }
}
