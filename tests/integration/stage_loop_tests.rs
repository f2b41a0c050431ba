use async_trait::async_trait;
use checkpoint_walker::config::Config;
use checkpoint_walker::retry::Sleeper;
use checkpoint_walker::solver::TokenSolver;
use checkpoint_walker::walker::{ExhaustReason, KeySource, Outcome, StageLoop};
use checkpoint_walker::{RunState, SolverError, WalkerError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Solver that hands out `proof-<site key>` and records every request
#[derive(Default)]
struct StaticSolver {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl TokenSolver for StaticSolver {
    async fn solve_challenge(&self, page_url: &str, site_key: &str) -> Result<String, SolverError> {
        self.calls
            .lock()
            .unwrap()
            .push((page_url.to_string(), site_key.to_string()));
        Ok(format!("proof-{}", site_key))
    }
}

impl StaticSolver {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

/// Creates a configuration pointing both services at mock servers
fn create_test_config(checkpoint: &MockServer, bypass: &MockServer, max_stage: u32) -> Config {
    let mut config = Config::default();
    config.checkpoint.host = checkpoint.uri();
    config.checkpoint.site_key = "cp-site".to_string();
    config.checkpoint.max_stage = max_stage;
    config.bypass.host = bypass.uri();
    config.bypass.api_host = bypass.uri();
    config.bypass.site_key = "bp-site".to_string();
    config.bypass.poll_interval_ms = 10;
    config.bypass.max_poll_attempts = 5;
    config.network.retry.base_delay_ms = 1;
    config
}

fn checkpoint_page(progress: &str, key: Option<&str>) -> String {
    let key_html = key
        .map(|k| format!(r#"<div id="key-display">{}</div>"#, k))
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <div class="flex justify-between text-sm font-medium text-gray-300">
            <span>Progress</span><span>{}</span>
        </div>
        {}
        </body></html>"#,
        progress, key_html
    )
}

fn build_loop(config: &Config, solver: Arc<StaticSolver>) -> StageLoop {
    StageLoop::from_config(config, solver, Arc::new(NoSleep)).expect("Failed to build stage loop")
}

/// Every checkpoint POST answers with a redirect to a challenge URL
async fn mount_advancing_checkpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex("^/lootlabs"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://challenge.example.com/c"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_key_on_first_checkpoint_skips_bypass() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lootlabs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(checkpoint_page("3/3", Some("SECRET"))),
        )
        .mount(&checkpoint)
        .await;
    mount_advancing_checkpoint(&checkpoint).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let solver = Arc::new(StaticSolver::default());
    let outcome = build_loop(&config, solver.clone())
        .run(&CancellationToken::new())
        .await
        .expect("Walk failed");

    assert_eq!(outcome.state(), RunState::KeyFound);
    assert_eq!(
        outcome,
        Outcome::KeyFound {
            stage: 0,
            key: "SECRET".to_string(),
            source: KeySource::Checkpoint,
        }
    );
    assert_eq!(
        solver.calls(),
        vec![(format!("{}/lootlabs", checkpoint.uri()), "cp-site".to_string())]
    );
}

#[tokio::test]
async fn test_key_at_stage_one() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lootlabs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(checkpoint_page("0/3", None)))
        .mount(&checkpoint)
        .await;
    Mock::given(method("GET"))
        .and(path("/lootlabs/step/abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(checkpoint_page("1/3", Some("SECRET"))),
        )
        .mount(&checkpoint)
        .await;

    Mock::given(method("POST"))
        .and(path("/lootlabs"))
        .and(body_string_contains("id=0"))
        .and(body_string_contains("cf-turnstile-response=proof-cp-site"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://challenge.example.com/c"),
        )
        .expect(1)
        .mount(&checkpoint)
        .await;
    Mock::given(method("POST"))
        .and(path("/lootlabs/step/abc"))
        .and(body_string_contains("id=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&checkpoint)
        .await;

    Mock::given(method("POST"))
        .and(path("/bypass"))
        .and(header("token", "proof-bp-site"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isLongLivedToken": false,
            "data": format!("{}/lootlabs/step/abc", checkpoint.uri()),
        })))
        .expect(1)
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let solver = Arc::new(StaticSolver::default());
    let outcome = build_loop(&config, solver.clone())
        .run(&CancellationToken::new())
        .await
        .expect("Walk failed");

    assert_eq!(outcome.state(), RunState::KeyFound);
    assert_eq!(outcome.key(), Some("SECRET"));
    assert!(matches!(outcome, Outcome::KeyFound { stage: 1, .. }));

    let calls = solver.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[1],
        (format!("{}/bypass", bypass.uri()), "bp-site".to_string())
    );
}

#[tokio::test]
async fn test_missing_next_url_exhausts_chain() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lootlabs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(checkpoint_page("0/3", None)))
        .mount(&checkpoint)
        .await;
    Mock::given(method("POST"))
        .and(path("/lootlabs"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&checkpoint)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let outcome = build_loop(&config, Arc::default())
        .run(&CancellationToken::new())
        .await
        .expect("Exhaustion is not a failure");

    assert_eq!(
        outcome,
        Outcome::Exhausted {
            stage: 0,
            reason: ExhaustReason::NoNextUrl,
        }
    );
    assert_eq!(outcome.state(), RunState::Exhausted);
}

#[tokio::test]
async fn test_all_stages_without_key_exhausts_after_max_stage() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex("^/lootlabs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(checkpoint_page("0/3", None)))
        .expect(4)
        .mount(&checkpoint)
        .await;
    Mock::given(method("POST"))
        .and(path_regex("^/lootlabs"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://challenge.example.com/c"),
        )
        .expect(4)
        .mount(&checkpoint)
        .await;

    Mock::given(method("POST"))
        .and(path("/bypass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isLongLivedToken": false,
            "data": {"url": format!("{}/lootlabs/step/next", checkpoint.uri())},
        })))
        .expect(4)
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let solver = Arc::new(StaticSolver::default());
    let outcome = build_loop(&config, solver.clone())
        .run(&CancellationToken::new())
        .await
        .expect("Exhaustion is not a failure");

    assert_eq!(
        outcome,
        Outcome::Exhausted {
            stage: 3,
            reason: ExhaustReason::StagesDepleted,
        }
    );
    assert_eq!(solver.calls().len(), 8);
}

#[tokio::test]
async fn test_key_from_bypass_result_page() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lootlabs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(checkpoint_page("2/3", None)))
        .mount(&checkpoint)
        .await;
    Mock::given(method("GET"))
        .and(path("/lootlabs/result/r1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(checkpoint_page("3/3", Some("FROM-RESULT"))),
        )
        .expect(1)
        .mount(&checkpoint)
        .await;
    mount_advancing_checkpoint(&checkpoint).await;

    Mock::given(method("POST"))
        .and(path("/bypass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isLongLivedToken": true,
            "data": "task-1",
        })))
        .mount(&bypass)
        .await;
    Mock::given(method("GET"))
        .and(path("/long-lived/task-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "COMPLETED",
            "progress": 100,
            "result": format!("{}/lootlabs/result/r1", checkpoint.uri()),
        })))
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let outcome = build_loop(&config, Arc::default())
        .run(&CancellationToken::new())
        .await
        .expect("Walk failed");

    assert_eq!(
        outcome,
        Outcome::KeyFound {
            stage: 0,
            key: "FROM-RESULT".to_string(),
            source: KeySource::BypassResult,
        }
    );
}

#[tokio::test]
async fn test_bypass_rejection_fails_the_run() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lootlabs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(checkpoint_page("0/3", None)))
        .mount(&checkpoint)
        .await;
    mount_advancing_checkpoint(&checkpoint).await;

    Mock::given(method("POST"))
        .and(path("/bypass"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .expect(1)
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let failure = build_loop(&config, Arc::default())
        .run(&CancellationToken::new())
        .await
        .expect_err("Bypass rejection must fail the run");

    assert_eq!(failure.state(), RunState::Failed);
    assert_eq!(failure.stage, 0);
    assert_eq!(failure.url, format!("{}/lootlabs", checkpoint.uri()));
    assert!(matches!(
        failure.source,
        WalkerError::BypassStart { status: 500, .. }
    ));
}

#[tokio::test]
async fn test_unrecognized_bypass_payload_fails_the_run() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lootlabs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(checkpoint_page("0/3", None)))
        .mount(&checkpoint)
        .await;
    mount_advancing_checkpoint(&checkpoint).await;

    Mock::given(method("POST"))
        .and(path("/bypass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isLongLivedToken": false,
            "data": {"unexpected": true},
        })))
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let failure = build_loop(&config, Arc::default())
        .run(&CancellationToken::new())
        .await
        .expect_err("Unrecognized payload must fail the run");

    match failure.source {
        WalkerError::Normalization { payload } => {
            assert_eq!(payload, json!({"unexpected": true}));
        }
        other => panic!("expected normalization error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_data_field_fails_instead_of_falling_back_to_url() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lootlabs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(checkpoint_page("0/3", None)))
        .mount(&checkpoint)
        .await;
    mount_advancing_checkpoint(&checkpoint).await;

    Mock::given(method("POST"))
        .and(path("/bypass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isLongLivedToken": false,
            "data": {"data": "", "url": "https://elsewhere.example.com/next"},
        })))
        .expect(1)
        .mount(&bypass)
        .await;

    let config = create_test_config(&checkpoint, &bypass, 3);
    let failure = build_loop(&config, Arc::default())
        .run(&CancellationToken::new())
        .await
        .expect_err("Empty data URL must fail the run");

    assert_eq!(failure.stage, 0);
    assert!(matches!(failure.source, WalkerError::Normalization { .. }));
}

#[tokio::test]
async fn test_cancelled_run_fails_without_requests() {
    let checkpoint = MockServer::start().await;
    let bypass = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&checkpoint)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = create_test_config(&checkpoint, &bypass, 3);
    let failure = build_loop(&config, Arc::default())
        .run(&cancel)
        .await
        .expect_err("Cancelled run must fail");

    assert!(matches!(failure.source, WalkerError::Cancelled));
}
