//! HTTP client construction
//!
//! The checkpoint service is talked to with redirects disabled so the
//! stage-advance `Location` header can be read. The bypass service and result
//! pages use a client that follows redirects.

use crate::config::NetworkConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Upper bound on the TCP/TLS connect phase
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum redirect hops followed when `follow_redirects` is set
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with the configured timeout and user agent
///
/// # Arguments
///
/// * `config` - The network configuration
/// * `follow_redirects` - Whether 3xx responses are followed automatically
///
/// # Example
///
/// ```no_run
/// use checkpoint_walker::config::NetworkConfig;
/// use checkpoint_walker::walker::build_http_client;
///
/// let client = build_http_client(&NetworkConfig::default(), false).unwrap();
/// ```
pub fn build_http_client(
    config: &NetworkConfig,
    follow_redirects: bool,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(config.fetch_timeout_ms);
    let redirect = if follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(CONNECT_TIMEOUT))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}
