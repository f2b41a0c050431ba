use serde::Deserialize;

/// Main configuration structure for Checkpoint-Walker
///
/// Every section and every field has a default, so an empty file (or no file
/// at all) yields a working configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub checkpoint: CheckpointConfig,
    pub bypass: BypassConfig,
    pub network: NetworkConfig,
    pub solver: SolverConfig,
}

/// Checkpoint service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Origin of the checkpoint service
    pub host: String,

    /// Captcha site key for checkpoint pages
    #[serde(rename = "site-key")]
    pub site_key: String,

    /// Highest stage index the walker will attempt (inclusive)
    #[serde(rename = "max-stage")]
    pub max_stage: u32,

    /// Path of the first checkpoint page, relative to `host`
    #[serde(rename = "entry-path")]
    pub entry_path: String,

    /// Path prefix of result pages that may carry the key
    #[serde(rename = "result-path")]
    pub result_path: String,

    /// Form field that carries the proof token on stage-advance requests
    #[serde(rename = "proof-field")]
    pub proof_field: String,

    /// CSS selector matching the progress indicator candidates
    #[serde(rename = "progress-selector")]
    pub progress_selector: String,

    /// Which match of `progress_selector` holds the "current/total" text
    #[serde(rename = "progress-index")]
    pub progress_index: usize,

    /// CSS selector of the key display element
    #[serde(rename = "key-selector")]
    pub key_selector: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            host: "https://key.volcano.wtf".to_string(),
            site_key: "0x4AAAAAABNx91M7AJvQomg-".to_string(),
            max_stage: 3,
            entry_path: "/lootlabs".to_string(),
            result_path: "/lootlabs/result/".to_string(),
            proof_field: "cf-turnstile-response".to_string(),
            progress_selector: ".flex.justify-between.text-sm.font-medium.text-gray-300 span"
                .to_string(),
            progress_index: 1,
            key_selector: "#key-display".to_string(),
        }
    }
}

impl CheckpointConfig {
    /// URL of the first checkpoint page, also the page the captcha is solved for
    pub fn entry_url(&self) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), self.entry_path)
    }

    /// Prefix a bypassed URL must start with to be treated as a result page
    pub fn result_prefix(&self) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), self.result_path)
    }
}

/// Bypass service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BypassConfig {
    /// Public site of the bypass service (captcha page)
    pub host: String,

    /// API origin of the bypass service
    #[serde(rename = "api-host")]
    pub api_host: String,

    /// Captcha site key for the bypass page
    #[serde(rename = "site-key")]
    pub site_key: String,

    /// Delay between task status polls (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of task status polls
    #[serde(rename = "max-poll-attempts")]
    pub max_poll_attempts: u32,

    /// Optional wall-clock bound on one polling loop (milliseconds)
    #[serde(rename = "max-poll-duration-ms")]
    pub max_poll_duration_ms: Option<u64>,

    /// Value of the `x-captcha-provider` header
    #[serde(rename = "captcha-provider")]
    pub captcha_provider: String,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            host: "https://bypass.city".to_string(),
            api_host: "https://api2.bypass.city".to_string(),
            site_key: "0x4AAAAAAAGzw6rXeQWJ_y2P".to_string(),
            poll_interval_ms: 2000,
            max_poll_attempts: 5000,
            max_poll_duration_ms: None,
            captcha_provider: "TURNSTILE".to_string(),
        }
    }
}

impl BypassConfig {
    /// Page the bypass captcha is solved for
    pub fn page_url(&self) -> String {
        format!("{}/bypass", self.host.trim_end_matches('/'))
    }
}

/// Network behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout (milliseconds)
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,

    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Backoff settings for the checkpoint info fetch
    pub retry: RetryConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 15_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential backoff settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 500,
            factor: 2.0,
        }
    }
}

/// Captcha solver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// API origin of the solver service
    #[serde(rename = "api-host")]
    pub api_host: String,

    /// File holding the solver API key on a single line
    #[serde(rename = "credentials-path")]
    pub credentials_path: String,

    /// Delay between solver result polls (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of solver result polls
    #[serde(rename = "max-poll-attempts")]
    pub max_poll_attempts: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            api_host: "https://api.2captcha.com".to_string(),
            credentials_path: "token.txt".to_string(),
            poll_interval_ms: 5000,
            max_poll_attempts: 60,
        }
    }
}
