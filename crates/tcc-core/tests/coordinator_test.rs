// Coordinator and command executor behavior against a wiremock portal.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tcc_api::{AUTH_COOKIE, Credentials, RetryPolicy, TccClient, TransportConfig};
use tcc_core::{
    Account, AccountConfig, Command, CommandExecutor, Coordinator, CoreError, DeviceState, Phase,
    RefreshTarget, SystemMode,
};

// ── Helpers ─────────────────────────────────────────────────────────

const DEVICE: u64 = 4321;

fn fast(policy: RetryPolicy) -> RetryPolicy {
    policy.with_backoff(Duration::from_millis(1), 2.0)
}

fn client_for(server: &MockServer, policy: RetryPolicy) -> Arc<TccClient> {
    let transport = TransportConfig::new(Url::parse(&server.uri()).unwrap());
    Arc::new(
        TccClient::new(Credentials::new("user@example.com", "hunter2"), policy, &transport)
            .unwrap(),
    )
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", format!("{AUTH_COOKIE}=abc123; path=/")),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn device_path() -> String {
    format!("/portal/Device/CheckDataSession/{DEVICE}")
}

fn snapshot(temp: f64) -> serde_json::Value {
    json!({
        "success": true,
        "deviceLive": true,
        "communicationLost": false,
        "latestData": {
            "uiData": {
                "DispTemperature": temp,
                "HeatSetpoint": 68.0,
                "CoolSetpoint": 76.0,
                "DisplayUnits": "F",
                "SystemSwitchPosition": 1,
                "SwitchHeatAllowed": true,
                "SwitchCoolAllowed": true,
                "HeatLowerSetptLimit": 40.0,
                "HeatUpperSetptLimit": 90.0,
                "CoolLowerSetptLimit": 50.0,
                "CoolUpperSetptLimit": 99.0
            },
            "hasFan": false
        }
    })
}

async fn mount_state(server: &MockServer, temp: f64, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(device_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(temp)));
    match times {
        Some(n) => mock.up_to_n_times(n).with_priority(1).mount(server).await,
        None => mock.mount(server).await,
    }
}

async fn mount_state_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(device_path()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Wraps a coordinator and counts refresh requests.
struct CountingTarget {
    inner: Arc<Coordinator>,
    refreshes: AtomicUsize,
}

impl RefreshTarget for CountingTarget {
    fn current_state(&self) -> Arc<DeviceState> {
        self.inner.state()
    }

    fn request_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Stale-serve and threshold ───────────────────────────────────────

#[tokio::test]
async fn test_stale_served_until_threshold_then_recovers() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_state(&server, 70.0, Some(1)).await;
    mount_state_status(&server, 500).await;

    let client = client_for(&server, fast(RetryPolicy::default().with_max_retries(0)));
    let coordinator = Coordinator::connect(Arc::clone(&client), DEVICE, "Hallway", 5)
        .await
        .unwrap();
    let initial = coordinator.state();
    assert_eq!(initial.current_temperature, Some(70.0));

    for failures in 1..=4 {
        let outcome = coordinator.poll().await;
        assert!(outcome.available, "failure {failures} should stale-serve");
        assert_eq!(outcome.phase, Phase::StaleServed);
        assert_eq!(outcome.consecutive_failures, failures);
        assert!(Arc::ptr_eq(&outcome.state, &initial));
        assert!(outcome.error.is_some());
    }

    let fifth = coordinator.poll().await;
    assert!(!fifth.available);
    assert_eq!(fifth.phase, Phase::Failed);
    assert_eq!(fifth.consecutive_failures, 5);
    assert!(Arc::ptr_eq(&fifth.state, &initial));
    assert!(fifth.error.as_ref().unwrap().is_transient());

    let sixth = coordinator.poll().await;
    assert!(!sixth.available);

    // Portal recovers.
    server.reset().await;
    mount_login(&server).await;
    mount_state(&server, 72.5, None).await;

    let recovered = coordinator.poll().await;
    assert!(recovered.available);
    assert_eq!(recovered.phase, Phase::Updated);
    assert_eq!(recovered.consecutive_failures, 0);
    assert_eq!(recovered.state.current_temperature, Some(72.5));
    assert!(recovered.error.is_none());
    assert_eq!(coordinator.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_exhausted_client_retries_count_once() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_state(&server, 70.0, Some(1)).await;
    Mock::given(method("GET"))
        .and(path(device_path()))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_for(&server, fast(RetryPolicy::default()));
    let coordinator = Coordinator::connect(Arc::clone(&client), DEVICE, "Hallway", 5)
        .await
        .unwrap();

    let outcome = coordinator.poll().await;

    assert!(outcome.available);
    assert_eq!(outcome.consecutive_failures, 1);
    assert_eq!(client.metrics().backoff_waits, 3);
    match outcome.error.as_deref() {
        Some(tcc_api::Error::Transient { attempts, .. }) => assert_eq!(*attempts, 4),
        other => panic!("expected Transient, got {other:?}"),
    }
}

#[tokio::test]
async fn test_outcomes_are_published() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_state(&server, 70.0, None).await;

    let client = client_for(&server, fast(RetryPolicy::default()));
    let coordinator = Coordinator::connect(client, DEVICE, "Hallway", 5)
        .await
        .unwrap();
    let mut rx = coordinator.subscribe();
    rx.borrow_and_update();

    coordinator.poll().await;

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow().phase, Phase::Updated);
}

// ── Scheduling ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_refresh_short_circuits_interval() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_state(&server, 70.0, Some(1)).await;
    mount_state(&server, 65.0, None).await;

    let client = client_for(&server, fast(RetryPolicy::default()));
    let coordinator = Arc::new(
        Coordinator::connect(client, DEVICE, "Hallway", 5)
            .await
            .unwrap(),
    );
    let mut rx = coordinator.subscribe();
    rx.borrow_and_update();

    let cancel = CancellationToken::new();
    let task = tokio::spawn(
        Arc::clone(&coordinator).run(Duration::from_secs(3600), cancel.clone()),
    );

    coordinator.request_refresh();
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("refresh did not trigger a poll")
        .unwrap();
    assert_eq!(rx.borrow().state.current_temperature, Some(65.0));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
}

// ── Commands ────────────────────────────────────────────────────────

async fn executor_for(
    server: &MockServer,
) -> (CommandExecutor, Arc<CountingTarget>) {
    mount_login(server).await;
    mount_state(server, 70.0, None).await;
    let client = client_for(server, fast(RetryPolicy::default()));
    let coordinator = Arc::new(
        Coordinator::connect(Arc::clone(&client), DEVICE, "Hallway", 5)
            .await
            .unwrap(),
    );
    let target = Arc::new(CountingTarget {
        inner: coordinator,
        refreshes: AtomicUsize::new(0),
    });
    let executor = CommandExecutor::new(
        client,
        target.clone(),
        fast(RetryPolicy::for_commands()),
        tcc_core::AwaySetpoints::default(),
    );
    (executor, target)
}

#[tokio::test]
async fn test_command_fails_twice_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/portal/Device/SubmitControlScreenChanges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": 0 })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/portal/Device/SubmitControlScreenChanges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    let (executor, target) = executor_for(&server).await;

    executor
        .execute(Command::SetHeatSetpoint(66.0))
        .await
        .unwrap();

    assert_eq!(target.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_command_budget_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/portal/Device/SubmitControlScreenChanges"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;
    let (executor, target) = executor_for(&server).await;

    let err = executor
        .execute(Command::SetSystemMode(SystemMode::Cool))
        .await
        .unwrap_err();

    match err {
        CoreError::Command { attempts, source } => {
            assert_eq!(attempts, 3);
            assert_eq!(source.status(), Some(404));
        }
        other => panic!("expected Command, got {other:?}"),
    }
    assert_eq!(target.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_command_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/portal/Device/SubmitControlScreenChanges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": 1 })))
        .expect(0)
        .mount(&server)
        .await;
    let (executor, target) = executor_for(&server).await;

    let err = executor
        .execute(Command::SetHeatSetpoint(120.0))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }), "got {err:?}");
    assert_eq!(target.refreshes.load(Ordering::SeqCst), 0);
}

// ── Serialization ───────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_polls_and_commands_never_overlap() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path(device_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(snapshot(70.0))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/portal/Device/SubmitControlScreenChanges"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": 1 }))
                .set_delay(Duration::from_millis(20)),
        )
        .expect(3)
        .mount(&server)
        .await;
    let client = client_for(&server, fast(RetryPolicy::default()));
    let coordinator = Arc::new(
        Coordinator::connect(Arc::clone(&client), DEVICE, "Hallway", 5)
            .await
            .unwrap(),
    );
    let executor = Arc::new(CommandExecutor::new(
        Arc::clone(&client),
        coordinator.clone(),
        fast(RetryPolicy::for_commands()),
        tcc_core::AwaySetpoints::default(),
    ));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..3 {
        let coordinator = Arc::clone(&coordinator);
        tasks.spawn(async move {
            let outcome = coordinator.poll().await;
            assert_eq!(outcome.phase, Phase::Updated);
        });
        let executor = Arc::clone(&executor);
        tasks.spawn(async move {
            executor
                .execute(Command::SetHeatSetpoint(64.0 + f64::from(i)))
                .await
                .unwrap();
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let metrics = client.metrics();
    assert_eq!(metrics.max_in_flight, 1);
    // login POST + verify GET + first fetch + 3 polls + 3 commands
    assert_eq!(metrics.requests_sent, 9);
}

// ── Account ─────────────────────────────────────────────────────────

async fn mount_locations(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/portal/Location/GetLocationListData/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "LocationID": 1,
            "Name": "Home",
            "Devices": [{ "DeviceID": DEVICE, "Name": "Hallway" }]
        }])))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal/Location/GetLocationListData/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

fn account_config(server: &MockServer) -> AccountConfig {
    let mut config =
        AccountConfig::new(Credentials::new("user@example.com", "hunter2")).unwrap();
    config.base_url = Url::parse(&server.uri()).unwrap();
    config.fetch_retry = fast(RetryPolicy::default());
    config.command_retry = fast(RetryPolicy::for_commands());
    config.poll_interval = Duration::from_secs(3600);
    config
}

#[tokio::test]
async fn test_account_connects_and_runs() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_locations(&server).await;
    mount_state(&server, 70.0, None).await;
    Mock::given(method("POST"))
        .and(path("/portal/Device/SubmitControlScreenChanges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let account = Account::connect(account_config(&server)).await.unwrap();

    assert_eq!(account.locations().len(), 1);
    assert_eq!(account.devices().len(), 1);
    let device = account.device(DEVICE).unwrap();
    assert_eq!(device.coordinator.name(), "Hallway");

    account.spawn().await;
    account
        .execute(DEVICE, Command::ResumeSchedule)
        .await
        .unwrap();
    assert!(matches!(
        account.execute(1, Command::ResumeSchedule).await,
        Err(CoreError::DeviceNotFound { device_id: 1 })
    ));

    tokio::time::timeout(Duration::from_secs(2), account.shutdown())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_account_without_matching_devices() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_locations(&server).await;

    let mut config = account_config(&server);
    config.devices = Some(vec![999]);

    let err = Account::connect(config).await.err().unwrap();
    assert!(matches!(err, CoreError::NoDevices), "got {err:?}");
}
