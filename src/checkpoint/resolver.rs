//! Checkpoint request handling
//!
//! The client handed to [`CheckpointResolver`] must not follow redirects: the
//! next hop is read straight from the `Location` header of the stage-advance
//! response.

use crate::checkpoint::Checkpoint;
use crate::extract::{KeyExtractor, Progress};
use crate::retry::{retry, until_cancelled, RetryPolicy, Sleeper};
use crate::WalkerError;
use reqwest::header::LOCATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Client for the checkpoint service
pub struct CheckpointResolver {
    client: Client,
    extractor: Arc<dyn KeyExtractor>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    proof_field: String,
}

impl CheckpointResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client with redirect following disabled
    /// * `extractor` - Reads progress and key from checkpoint pages
    /// * `retry` - Backoff policy for the idempotent info fetch
    /// * `sleeper` - Where backoff delays are spent
    /// * `proof_field` - Form field name carrying the proof token
    pub fn new(
        client: Client,
        extractor: Arc<dyn KeyExtractor>,
        retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        proof_field: impl Into<String>,
    ) -> Self {
        Self {
            client,
            extractor,
            retry,
            sleeper,
            proof_field: proof_field.into(),
        }
    }

    /// Fetches a checkpoint page and reads its progress
    ///
    /// Transient failures are retried under the configured policy. A 302
    /// response is a valid answer and its body is parsed like any other.
    pub async fn get_info(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Progress, WalkerError> {
        retry(&self.retry, self.sleeper.as_ref(), cancel, move |_| {
            self.fetch_info(url, cancel)
        })
        .await
    }

    async fn fetch_info(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Progress, WalkerError> {
        let target = parse_url(url)?;
        let response = self.send(self.client.get(target), url, cancel).await?;
        let html = until_cancelled(cancel, async {
            response.text().await.map_err(|source| WalkerError::Transport {
                url: url.to_string(),
                source,
            })
        })
        .await?;

        Ok(self.extractor.extract_progress(&html))
    }

    /// Resolves one checkpoint: reads its progress, then submits the stage
    ///
    /// # Arguments
    ///
    /// * `url` - Checkpoint URL
    /// * `id` - Identifier of the previous hop
    /// * `proof_token` - Solved captcha token for the checkpoint site key
    /// * `cancel` - Aborts in-flight requests
    ///
    /// # Returns
    ///
    /// * `Ok(Checkpoint)` - Stage, optional next hop and optional key
    /// * `Err(WalkerError::MissingUrl)` - `url` is absent; nothing was sent
    /// * `Err(WalkerError::MissingIdentifier)` - `id` is absent; nothing was sent
    /// * `Err(WalkerError)` - A request failed
    pub async fn next_checkpoint(
        &self,
        url: Option<&str>,
        id: Option<&str>,
        proof_token: &str,
        cancel: &CancellationToken,
    ) -> Result<Checkpoint, WalkerError> {
        let url = url.filter(|u| !u.is_empty()).ok_or(WalkerError::MissingUrl)?;
        let id = id.ok_or(WalkerError::MissingIdentifier)?;

        let info = self.get_info(url, cancel).await?;

        let target = parse_url(url)?;
        let request = self
            .client
            .post(target.clone())
            .form(&[("id", id), (self.proof_field.as_str(), proof_token)]);
        let response = self.send(request, url, cancel).await?;

        let next_url = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .map(|location| resolve_location(&target, location));

        tracing::debug!(
            "Checkpoint {} answered {} with location {:?}",
            url,
            response.status(),
            next_url
        );

        Ok(Checkpoint {
            current_stage: info.current_stage,
            next_url,
            key: info.key,
        })
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Response, WalkerError> {
        let response = until_cancelled(cancel, async {
            request.send().await.map_err(|source| WalkerError::Transport {
                url: url.to_string(),
                source,
            })
        })
        .await?;

        ensure_status(url, response)
    }
}

fn parse_url(url: &str) -> Result<Url, WalkerError> {
    Url::parse(url).map_err(|e| WalkerError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Accepts 2xx and 302; everything else is an HTTP failure
fn ensure_status(url: &str, response: Response) -> Result<Response, WalkerError> {
    let status = response.status();
    if status.is_success() || status == StatusCode::FOUND {
        Ok(response)
    } else {
        Err(WalkerError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Makes a relative `Location` absolute against the request URL
fn resolve_location(base: &Url, location: &str) -> String {
    base.join(location)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| location.to_string())
}
