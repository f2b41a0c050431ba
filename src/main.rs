//! Checkpoint-Walker main entry point
//!
//! This is the command-line interface for the checkpoint chain walker.

use anyhow::Context;
use checkpoint_walker::config::{load_config_with_hash, Config};
use checkpoint_walker::retry::TokioSleeper;
use checkpoint_walker::solver::{read_credentials, TwoCaptchaSolver};
use checkpoint_walker::state::RunState;
use checkpoint_walker::walker::{build_http_client, walk, Outcome};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Checkpoint-Walker: walks a captcha-gated checkpoint chain to its key
///
/// Each stage solves a captcha token, resolves the checkpoint, and hands the
/// next hop to the bypass service until a key appears or the chain ends.
#[derive(Parser, Debug)]
#[command(name = "checkpoint-walker")]
#[command(version = "1.0.0")]
#[command(about = "Walks a captcha-gated checkpoint chain to its key", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Solver credentials file, overriding solver.credentials-path
    #[arg(long, value_name = "PATH")]
    credentials: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Exit with status 2 when the chain ends without a key
    #[arg(long)]
    fail_on_exhausted: bool,

    /// Validate config and show what would be walked without sending requests
    #[arg(long)]
    dry_run: bool,
}

/// Exit status when a stage fails
const EXIT_FAILED: u8 = 1;

/// Exit status when the chain is exhausted and `--fail-on-exhausted` is set
const EXIT_EXHAUSTED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load(cli.config.as_deref())?;

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let credentials_path = cli
        .credentials
        .unwrap_or_else(|| PathBuf::from(&config.solver.credentials_path));
    let api_key = read_credentials(&credentials_path)?;

    let solver = TwoCaptchaSolver::new(
        build_http_client(&config.network, true).context("building solver client")?,
        &config.solver,
        api_key,
        Arc::new(TokioSleeper),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    tracing::info!("# CHECKPOINT WALKER #");
    let state = match walk(&config, Arc::new(solver), &cancel).await? {
        Ok(outcome) => {
            match &outcome {
                Outcome::KeyFound { stage, key, source } => {
                    tracing::info!("Key obtained at stage {} from {:?}", stage, source);
                    println!("{}", key);
                }
                Outcome::Exhausted { stage, reason } => {
                    tracing::warn!("Chain exhausted at stage {} ({})", stage, reason);
                }
            }
            outcome.state()
        }
        Err(failure) => {
            tracing::error!("Walk failed: {}", failure);
            failure.state()
        }
    };

    tracing::info!("Run finished: {}", state);
    Ok(ExitCode::from(exit_status(state, cli.fail_on_exhausted)))
}

/// Maps the final run state to the process exit status
fn exit_status(state: RunState, fail_on_exhausted: bool) -> u8 {
    if state.is_error() {
        EXIT_FAILED
    } else if state.is_success() || !fail_on_exhausted {
        0
    } else {
        EXIT_EXHAUSTED
    }
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("checkpoint_walker=info,warn"),
            1 => EnvFilter::new("checkpoint_walker=debug,info"),
            2 => EnvFilter::new("checkpoint_walker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn print_dry_run(config: &Config) {
    println!("=== Checkpoint-Walker Dry Run ===\n");

    println!("Checkpoint:");
    println!("  Entry URL: {}", config.checkpoint.entry_url());
    println!("  Result prefix: {}", config.checkpoint.result_prefix());
    println!("  Max stage: {}", config.checkpoint.max_stage);

    println!("\nBypass:");
    println!("  Captcha page: {}", config.bypass.page_url());
    println!("  API host: {}", config.bypass.api_host);
    println!(
        "  Polling: every {}ms, up to {} attempts",
        config.bypass.poll_interval_ms, config.bypass.max_poll_attempts
    );
    if let Some(ms) = config.bypass.max_poll_duration_ms {
        println!("  Poll deadline: {}ms", ms);
    }

    println!("\nNetwork:");
    println!("  Fetch timeout: {}ms", config.network.fetch_timeout_ms);
    println!(
        "  Retry: {} attempts, {}ms base delay, factor {}",
        config.network.retry.attempts,
        config.network.retry.base_delay_ms,
        config.network.retry.factor
    );

    println!("\nSolver:");
    println!("  API host: {}", config.solver.api_host);
    println!("  Credentials: {}", config.solver.credentials_path);

    println!("\n✓ Configuration is valid");
}
