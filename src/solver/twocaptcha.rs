//! 2Captcha-compatible task API client
//!
//! Uses the JSON task API: `createTask` submits a Turnstile task, then
//! `getTaskResult` is polled until the status is `ready`.

use crate::config::SolverConfig;
use crate::retry::Sleeper;
use crate::solver::TokenSolver;
use crate::SolverError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    error_id: i64,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    task_id: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
struct Solution {
    #[serde(default)]
    token: Option<String>,
}

impl ApiResponse {
    fn into_result(self) -> Result<Self, SolverError> {
        if self.error_id == 0 {
            return Ok(self);
        }
        Err(SolverError::Api {
            code: self
                .error_code
                .unwrap_or_else(|| format!("errorId {}", self.error_id)),
            description: self.error_description.unwrap_or_default(),
        })
    }
}

/// Turnstile solver backed by a 2Captcha-style HTTP API
pub struct TwoCaptchaSolver {
    client: Client,
    api_host: String,
    api_key: String,
    poll_interval: Duration,
    max_attempts: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl TwoCaptchaSolver {
    pub fn new(
        client: Client,
        config: &SolverConfig,
        api_key: impl Into<String>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            client,
            api_host: config.api_host.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_poll_attempts.max(1),
            sleeper,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, SolverError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_host, method))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TokenSolver for TwoCaptchaSolver {
    async fn solve_challenge(
        &self,
        page_url: &str,
        site_key: &str,
    ) -> Result<String, SolverError> {
        let created: ApiResponse = self
            .call(
                "createTask",
                json!({
                    "clientKey": self.api_key,
                    "task": {
                        "type": "TurnstileTaskProxyless",
                        "websiteURL": page_url,
                        "websiteKey": site_key,
                    }
                }),
            )
            .await?;
        let created = created.into_result()?;

        let task_id = created.task_id.ok_or(SolverError::MissingToken)?;
        let task_label = match &task_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        tracing::debug!("Solver task {} created for {}", task_label, page_url);

        for _ in 0..self.max_attempts {
            self.sleeper.sleep(self.poll_interval).await;

            let polled: ApiResponse = self
                .call(
                    "getTaskResult",
                    json!({ "clientKey": self.api_key, "taskId": task_id }),
                )
                .await?;
            let polled = polled.into_result()?;

            if polled.status.as_deref() == Some("ready") {
                return polled
                    .solution
                    .and_then(|s| s.token)
                    .filter(|t| !t.is_empty())
                    .ok_or(SolverError::MissingToken);
            }
        }

        Err(SolverError::Timeout {
            task_id: task_label,
        })
    }
}
