//! Bypass start and long-lived task polling
//!
//! # Flow
//!
//! 1. POST `{api_host}/bypass` with the challenge URL and proof token
//! 2. If the answer is not a long-lived token, its `data` is the result
//! 3. Otherwise `data` is a task id; GET `{api_host}/long-lived/{id}/status`
//!    until the task is `COMPLETED` or `FAILED`, or the poll budget runs out
//!
//! | Poll response | Action |
//! |---------------|--------|
//! | non-2xx | Logged, consumes an attempt |
//! | undecodable body | Logged, consumes an attempt |
//! | `QUEUED` / `IN_PROGRESS` | Sleep, poll again |
//! | `COMPLETED` | Normalize `result`, done |
//! | `FAILED` | `BypassTaskFailed`, not retried |
//! | transport error | Propagated |

use crate::bypass::types::{BypassResult, PollTask, StartResponse, TaskStatus};
use crate::config::BypassConfig;
use crate::extract::KeyExtractor;
use crate::retry::{sleep_or_cancel, until_cancelled, Sleeper};
use crate::url::normalize_payload;
use crate::WalkerError;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Polling budget for long-lived tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between status polls
    pub interval: Duration,
    /// Maximum number of status polls
    pub max_attempts: u32,
    /// Optional bound on total time spent polling
    pub max_duration: Option<Duration>,
}

impl From<&BypassConfig> for PollSettings {
    fn from(config: &BypassConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_poll_attempts,
            max_duration: config.max_poll_duration_ms.map(Duration::from_millis),
        }
    }
}

/// Client for the bypass service
pub struct BypassPoller {
    client: Client,
    api_host: String,
    captcha_provider: String,
    result_prefix: String,
    settings: PollSettings,
    extractor: Arc<dyn KeyExtractor>,
    sleeper: Arc<dyn Sleeper>,
}

impl BypassPoller {
    /// Creates a poller
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client for the bypass API and result pages
    /// * `api_host` - API origin of the bypass service
    /// * `captcha_provider` - Value of the `x-captcha-provider` header
    /// * `result_prefix` - URLs starting with this are scraped for a key
    /// * `settings` - Poll interval and budget
    /// * `extractor` - Reads the key from result pages
    /// * `sleeper` - Where poll intervals are spent
    pub fn new(
        client: Client,
        api_host: impl Into<String>,
        captcha_provider: impl Into<String>,
        result_prefix: impl Into<String>,
        settings: PollSettings,
        extractor: Arc<dyn KeyExtractor>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            client,
            api_host: api_host.into().trim_end_matches('/').to_string(),
            captcha_provider: captcha_provider.into(),
            result_prefix: result_prefix.into(),
            settings,
            extractor,
            sleeper,
        }
    }

    /// Resolves a challenge URL through the bypass service
    ///
    /// # Returns
    ///
    /// * `Ok(BypassResult)` - Immediate or completed result, with a key if the
    ///   resolved URL was a result page that showed one
    /// * `Err(WalkerError::BypassStart)` - The start call was rejected
    /// * `Err(WalkerError::MissingTaskId)` - Long-lived token without a task id
    /// * `Err(WalkerError::BypassTaskFailed)` - The task reported `FAILED`
    /// * `Err(WalkerError::BypassTimeout)` - The poll budget ran out
    pub async fn bypass(
        &self,
        url: &str,
        proof_token: &str,
        cancel: &CancellationToken,
    ) -> Result<BypassResult, WalkerError> {
        if url.is_empty() {
            return Err(WalkerError::MissingUrl);
        }
        if proof_token.is_empty() {
            return Err(WalkerError::MissingProofToken);
        }

        let start = self.start(url, proof_token, cancel).await?;

        if !start.is_long_lived_token {
            tracing::info!("Bypass: immediate result from API");
            return Ok(self.finish(start.data, None, cancel).await);
        }

        let task_id = start.task_id().ok_or(WalkerError::MissingTaskId)?;
        tracing::info!(
            "Bypass: long-lived task {} started, polling for completion",
            task_id
        );
        self.poll(task_id, cancel).await
    }

    async fn start(
        &self,
        url: &str,
        proof_token: &str,
        cancel: &CancellationToken,
    ) -> Result<StartResponse, WalkerError> {
        let endpoint = format!("{}/bypass", self.api_host);
        let request = self
            .client
            .post(&endpoint)
            .header("token", proof_token)
            .header("x-captcha-provider", self.captcha_provider.as_str())
            .json(&json!({ "url": url }));

        let response = until_cancelled(cancel, async {
            request.send().await.map_err(|source| WalkerError::Transport {
                url: endpoint.clone(),
                source,
            })
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalkerError::BypassStart {
                status: status.as_u16(),
                body,
            });
        }

        let body = until_cancelled(cancel, async {
            response.text().await.map_err(|source| WalkerError::Transport {
                url: endpoint.clone(),
                source,
            })
        })
        .await?;

        serde_json::from_str(&body).map_err(|e| WalkerError::Decode {
            url: endpoint.clone(),
            message: e.to_string(),
        })
    }

    async fn poll(
        &self,
        task_id: String,
        cancel: &CancellationToken,
    ) -> Result<BypassResult, WalkerError> {
        let status_url = format!("{}/long-lived/{}/status", self.api_host, task_id);
        let deadline = self.settings.max_duration.map(|d| Instant::now() + d);

        for attempt in 0..self.settings.max_attempts {
            if let Some(task) = self.poll_once(&status_url, &task_id, cancel).await? {
                tracing::info!(
                    "Bypass task {} status={} progress={:?}",
                    task_id,
                    task.status,
                    task.progress
                );

                if task.status.is_terminal() {
                    if task.status == TaskStatus::Failed {
                        return Err(WalkerError::BypassTaskFailed {
                            task_id,
                            status_payload: task.raw,
                        });
                    }
                    let raw = task.result.unwrap_or(Value::Null);
                    return Ok(self.finish(raw, Some(task_id), cancel).await);
                }
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!("Bypass task {} exceeded its polling deadline", task_id);
                break;
            }

            if attempt + 1 < self.settings.max_attempts {
                sleep_or_cancel(self.sleeper.as_ref(), self.settings.interval, cancel).await?;
            }
        }

        Err(WalkerError::BypassTimeout { task_id })
    }

    /// Polls once; `None` is a transient miss that still consumes an attempt
    async fn poll_once(
        &self,
        status_url: &str,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PollTask>, WalkerError> {
        let request = self
            .client
            .get(status_url)
            .header("content-type", "application/json");

        let response = until_cancelled(cancel, async {
            request.send().await.map_err(|source| WalkerError::Transport {
                url: status_url.to_string(),
                source,
            })
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Bypass status {} for task {}", status.as_u16(), task_id);
            return Ok(None);
        }

        match until_cancelled(cancel, async { Ok(response.json::<Value>().await) }).await? {
            Ok(body) => Ok(Some(PollTask::from_value(body))),
            Err(e) => {
                tracing::warn!("Undecodable status for task {}: {}", task_id, e);
                Ok(None)
            }
        }
    }

    /// Normalizes a final payload and scrapes the key from result pages
    async fn finish(
        &self,
        raw_payload: Value,
        task_id: Option<String>,
        cancel: &CancellationToken,
    ) -> BypassResult {
        let resolved_url = normalize_payload(&raw_payload);

        let key = match resolved_url.as_deref() {
            Some(url) if url.starts_with(&self.result_prefix) => {
                self.try_fetch_result_key(url, cancel).await
            }
            _ => None,
        };

        BypassResult {
            raw_payload,
            resolved_url,
            is_async_task: task_id.is_some(),
            task_id,
            key,
        }
    }

    /// Best-effort key lookup; every failure is logged and yields `None`
    async fn try_fetch_result_key(&self, url: &str, cancel: &CancellationToken) -> Option<String> {
        let fetched = until_cancelled(cancel, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|source| WalkerError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            if !response.status().is_success() {
                return Err(WalkerError::Http {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }

            response.text().await.map_err(|source| WalkerError::Transport {
                url: url.to_string(),
                source,
            })
        })
        .await;

        match fetched {
            Ok(html) => self.extractor.extract_key(&html),
            Err(WalkerError::Http { status, .. }) => {
                tracing::debug!("Result page GET returned {} for {}", status, url);
                None
            }
            Err(e) => {
                tracing::warn!("Error fetching result page {}: {}", url, e);
                None
            }
        }
    }
}
