//! End-to-end loop behaviour on a paused clock

use crate::support::{orchestrator, FixedProbe, RotationLog, Script, ScriptedWork};
use crawl_rotor::config::parse_config;
use crawl_rotor::pool::{HttpProbe, Identity, IdentityPool, Protocol};
use crawl_rotor::strategy::Policy;
use crawl_rotor::{ControlSurface, OrchestratorState};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(start_paused = true)]
async fn test_always_failing_loop_rotates_after_threshold() {
    let work = ScriptedWork::new(Script::Fail);
    let log = Arc::new(RotationLog::default());
    let orch = orchestrator(
        Policy {
            fail_threshold: 3,
            ..Policy::default()
        },
        true,
        work.clone(),
    )
    .with_observer(log.clone());
    orch.pool().insert(Identity::new("10.0.0.1:80", Protocol::Http, true));
    orch.pool().insert(Identity::new("10.0.0.2:80", Protocol::Http, true));

    assert!(orch.start());

    // Failed cycles at t=0, 5 and 10 build the streak; t=15 rotates
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(work.calls(), 3);
    assert_eq!(log.len(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(orch.stop().await);

    assert_eq!(work.calls(), 4);
    let entries = log.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].0.failure_based);
    assert_eq!(entries[0].0.consecutive_failures, 3);
    assert_eq!(entries[0].1.as_deref(), Some("10.0.0.2:80"));
    assert_eq!(orch.health().rotations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_saturated_slots_never_invoke_work() {
    let work = ScriptedWork::new(Script::Succeed(5));
    let orch = orchestrator(
        Policy {
            concurrency_limit: 2,
            ..Policy::default()
        },
        true,
        work.clone(),
    );

    let metrics = Arc::clone(orch.strategy().metrics());
    let first = metrics.try_acquire_slot(2).unwrap();
    let second = metrics.try_acquire_slot(2).unwrap();

    assert!(orch.start());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(orch.stop().await);

    assert_eq!(work.calls(), 0);
    let health = orch.health();
    assert_eq!(health.total_processed, 0);
    assert_eq!(health.current_concurrency, 2);

    drop(first);
    drop(second);
    assert_eq!(orch.health().current_concurrency, 0);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_work_does_not_end_loop() {
    let work = ScriptedWork::new(Script::Panic);
    let orch = orchestrator(Policy::default(), true, work.clone());

    assert!(orch.start());
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert_eq!(orch.state(), OrchestratorState::Running);
    assert_eq!(work.calls(), 3);

    let health = orch.health();
    assert_eq!(health.current_concurrency, 0);
    assert_eq!(health.consecutive_failures, 3);

    assert!(orch.stop().await);
    assert_eq!(orch.state(), OrchestratorState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_policy_update_applies_to_running_loop() {
    let work = ScriptedWork::new(Script::Succeed(1));
    let orch = orchestrator(Policy::default(), true, work.clone());

    assert!(orch.start());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(work.calls(), 1);

    // The pending 60s sleep was scheduled under the old interval
    orch.strategy().update(&crawl_rotor::PolicyUpdate {
        cycle_interval: Some(10),
        ..Default::default()
    });

    tokio::time::sleep(Duration::from_secs(80)).await;
    assert!(orch.stop().await);

    // t=0, 60, 70, 80
    assert_eq!(work.calls(), 4);
}

#[tokio::test]
async fn test_unreachable_proxy_is_pooled_invalid() {
    let probe = HttpProbe::new("http://probe.test/", Duration::from_secs(2), "TestBot/1.0");
    let pool = IdentityPool::new(Arc::new(probe));

    assert!(!pool.add("127.0.0.1:1", Protocol::Http).await);

    let status = pool.status();
    assert_eq!(status.total, 1);
    assert_eq!(status.valid, 0);
    assert!(pool.select_valid().is_none());
}

#[tokio::test]
async fn test_direct_mode_when_pool_has_no_valid_identity() {
    let work = ScriptedWork::new(Script::Succeed(2));
    let orch = orchestrator(Policy::default(), false, work.clone());
    orch.pool().add("10.0.0.9:3128", Protocol::Http).await;

    let report = orch.run_single_cycle().await;

    assert!(report.success);
    assert!(report.identity.is_none());
    assert_eq!(work.calls(), 1);
}

#[tokio::test]
async fn test_configured_http_work_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/rust/new.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"children": [{"id": 1}, {"id": 2}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = parse_config(&format!(
        r#"
[policy]
target-subject = "rust"

[work]
url-template = "{}/r/{{subject}}/new.json?limit={{limit}}"
items-pointer = "/data/children"
"#,
        server.uri()
    ))
    .unwrap();

    let control = ControlSurface::from_config(&config).unwrap();
    let report = control.test_cycle().await;

    assert!(report.success, "cycle failed: {:?}", report.error);
    assert_eq!(report.item_count, 2);
    assert!(report.identity.is_none());
    assert_eq!(control.get_health().total_processed, 2);
}

#[tokio::test]
async fn test_fixed_probe_double_is_consulted() {
    let pool = IdentityPool::new(Arc::new(FixedProbe(true)));
    assert!(pool.add("10.0.0.1:80", Protocol::Socks5).await);
    assert_eq!(pool.select_valid().unwrap().protocol, Protocol::Socks5);
}
