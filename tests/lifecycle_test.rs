mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;

use common::{Call, ScriptedTransport, refused, registry_config, timeout};
use registry_lifecycle::services::heartbeat::MAX_FAILURES_REASON;
use registry_lifecycle::services::lifecycle::{LifecycleError, RegistrationLifecycle, RegistryHooks};
use registry_lifecycle::services::state::RegistrationState;
use registry_lifecycle::services::transport::TransportError;

const A: &str = "http://a:8761";
const B: &str = "http://b:8761";
const C: &str = "http://c:8761";
const D: &str = "http://d:8761";

fn lifecycle(threshold: u32) -> (RegistrationLifecycle, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    let lifecycle = RegistrationLifecycle::new(registry_config(&[A, B], threshold), transport.clone());
    (lifecycle, transport)
}

fn is_register(call: &Call) -> bool {
    matches!(call, Call::Register(_))
}

fn is_deregister(call: &Call) -> bool {
    matches!(call, Call::Deregister(_))
}

#[tokio::test]
async fn test_register_fails_over_to_second_endpoint() {
    let (lifecycle, transport) = lifecycle(5);
    transport.push_register(Err(timeout(A)));

    let state = lifecycle.start().await.expect("registration should succeed on b");

    assert_eq!(state, RegistrationState::Registered);
    assert_eq!(lifecycle.state(), RegistrationState::Registered);
    assert_eq!(
        transport.calls(),
        vec![Call::Register(A.to_string()), Call::Register(B.to_string())]
    );

    let record = lifecycle.instance_record().await.unwrap();
    assert_eq!(record.instance_id, "svc-10.0.0.1-4000");

    // 成功后游标回到首选地址
    assert_eq!(lifecycle.router().cursor("default").unwrap().index, 0);

    lifecycle.stop().await;
}

#[tokio::test]
async fn test_registration_failed_after_all_endpoints() {
    let (lifecycle, transport) = lifecycle(5);
    transport.push_register(Err(timeout(A)));
    transport.push_register(Err(refused(B)));

    let err = lifecycle.start().await.unwrap_err();

    match err {
        LifecycleError::RegistrationFailed {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 2);
            assert!(matches!(last_error, TransportError::ConnectionRefused { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(lifecycle.state(), RegistrationState::Unregistered);
    assert_eq!(transport.calls().len(), 2);

    // 未注册时 stop 不发起注销
    lifecycle.stop().await;
    assert_eq!(transport.count(is_deregister), 0);
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let (lifecycle, transport) = lifecycle(5);

    lifecycle.start().await.unwrap();
    let second = lifecycle.start().await.unwrap();

    assert_eq!(second, RegistrationState::Registered);
    assert_eq!(transport.calls(), vec![Call::Register(A.to_string())]);

    lifecycle.stop().await;
}

#[tokio::test]
async fn test_stop_twice_deregisters_once() {
    let (lifecycle, transport) = lifecycle(5);
    lifecycle.start().await.unwrap();

    lifecycle.stop().await;
    assert_eq!(lifecycle.state(), RegistrationState::Unregistered);
    lifecycle.stop().await;

    assert_eq!(transport.count(is_deregister), 1);
    assert_eq!(transport.calls().last(), Some(&Call::Deregister(A.to_string())));
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let (lifecycle, transport) = lifecycle(5);

    lifecycle.stop().await;

    assert!(transport.calls().is_empty());
    assert_eq!(lifecycle.state(), RegistrationState::Unregistered);
}

#[tokio::test]
async fn test_deregister_failure_is_not_fatal() {
    let (lifecycle, transport) = lifecycle(5);
    transport.push_deregister(Err(refused(A)));
    lifecycle.start().await.unwrap();

    lifecycle.stop().await;

    assert_eq!(lifecycle.state(), RegistrationState::Unregistered);
    assert_eq!(transport.count(is_deregister), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_does_not_wait_for_hung_registry() {
    let (lifecycle, transport) = lifecycle(5);
    transport.hang_deregister(Duration::from_secs(3600));
    lifecycle.start().await.unwrap();

    let started = tokio::time::Instant::now();
    lifecycle.stop().await;

    // 宽限期为 5 秒
    assert!(started.elapsed() <= Duration::from_secs(6));
    assert_eq!(lifecycle.state(), RegistrationState::Unregistered);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeats_run_while_registered() {
    let (lifecycle, transport) = lifecycle(5);
    lifecycle.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(95)).await;
    assert_eq!(transport.count(|c| matches!(c, Call::Heartbeat(_))), 3);

    lifecycle.stop().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.count(|c| matches!(c, Call::Heartbeat(_))), 3);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_failure_reaches_terminal_state() {
    let (lifecycle, transport) = lifecycle(3);
    transport.fail_heartbeats_with(timeout(A));
    lifecycle.start().await.unwrap();

    let mut states = lifecycle.subscribe_state();
    let mut observed = Vec::new();
    while let Some(state) = states.next().await {
        let done = state.is_terminal();
        observed.push(state);
        if done {
            break;
        }
    }

    assert_eq!(
        observed,
        vec![
            RegistrationState::Registered,
            RegistrationState::HeartbeatFailing(1),
            RegistrationState::HeartbeatFailing(2),
            RegistrationState::Failed(MAX_FAILURES_REASON.to_string()),
        ]
    );

    // 终止状态下不再心跳，也不能重新启动
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(transport.count(|c| matches!(c, Call::Heartbeat(_))), 3);
    assert!(matches!(
        lifecycle.start().await,
        Err(LifecycleError::Terminal(_))
    ));

    lifecycle.stop().await;
    assert_eq!(transport.count(is_deregister), 0);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let (lifecycle, transport) = lifecycle(5);

    lifecycle.start().await.unwrap();
    lifecycle.stop().await;
    lifecycle.start().await.unwrap();

    assert_eq!(lifecycle.state(), RegistrationState::Registered);
    assert_eq!(transport.count(|c| matches!(c, Call::Register(_))), 2);

    lifecycle.stop().await;
}

#[tokio::test]
async fn test_disabled_hooks_are_noops() {
    let hooks = RegistryHooks::disabled();

    assert!(!hooks.is_enabled());
    assert!(hooks.on_start().await.is_ok());
    hooks.on_shutdown().await;
}

#[tokio::test]
async fn test_hooks_drive_lifecycle() {
    let (lifecycle, transport) = lifecycle(5);
    let hooks = RegistryHooks::new(lifecycle);

    hooks.on_start().await.unwrap();
    assert_eq!(
        hooks.lifecycle().unwrap().state(),
        RegistrationState::Registered
    );

    hooks.on_shutdown().await;
    assert_eq!(
        hooks.lifecycle().unwrap().state(),
        RegistrationState::Unregistered
    );
    assert_eq!(transport.count(is_deregister), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_slow_registration() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.hang_register(Duration::from_secs(5));
    for endpoint in [A, B, C, D] {
        transport.push_register(Err(timeout(endpoint)));
    }
    let lifecycle = Arc::new(RegistrationLifecycle::new(
        registry_config(&[A, B, C, D], 5),
        transport.clone(),
    ));

    let starting = tokio::spawn({
        let lifecycle = lifecycle.clone();
        async move { lifecycle.start().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let started = tokio::time::Instant::now();
    lifecycle.stop().await;

    // 宽限期为 5 秒，且不必等完 4 次注册超时
    assert!(started.elapsed() <= Duration::from_secs(5));
    assert!(matches!(
        starting.await.unwrap(),
        Err(LifecycleError::Cancelled)
    ));
    assert_eq!(lifecycle.state(), RegistrationState::Unregistered);
    assert_eq!(transport.count(is_register), 1);
    assert_eq!(transport.count(is_deregister), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_heartbeat_failing_deregisters_once() {
    let (lifecycle, transport) = lifecycle(5);
    transport.push_heartbeat(Err(timeout(A)));
    transport.hang_deregister(Duration::from_secs(1));
    lifecycle.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(lifecycle.state(), RegistrationState::HeartbeatFailing(1));
    assert_eq!(lifecycle.router().current_endpoint("default").unwrap(), B);

    let during_stop = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        lifecycle.state()
    };
    let ((), observed) = tokio::join!(lifecycle.stop(), during_stop);

    assert_eq!(observed, RegistrationState::Deregistering);
    assert_eq!(lifecycle.state(), RegistrationState::Unregistered);
    assert_eq!(transport.count(is_deregister), 1);
    // 注销发往轮换后的地址
    assert_eq!(transport.calls().last(), Some(&Call::Deregister(B.to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_restart_begins_at_primary_endpoint() {
    let (lifecycle, transport) = lifecycle(5);
    transport.push_heartbeat(Err(timeout(A)));
    lifecycle.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    lifecycle.stop().await;
    assert_eq!(lifecycle.router().current_endpoint("default").unwrap(), B);

    lifecycle.start().await.unwrap();

    assert_eq!(transport.calls().last(), Some(&Call::Register(A.to_string())));
    let cursor = lifecycle.router().cursor("default").unwrap();
    assert_eq!(cursor.index, 0);
    assert_eq!(cursor.consecutive_failures, 0);

    lifecycle.stop().await;
}

#[tokio::test]
async fn test_failed_start_does_not_carry_failures_into_retry() {
    let (lifecycle, transport) = lifecycle(5);
    transport.push_register(Err(timeout(A)));
    transport.push_register(Err(timeout(B)));
    transport.push_register(Err(timeout(A)));

    assert!(lifecycle.start().await.is_err());
    assert_eq!(
        lifecycle.router().cursor("default").unwrap().consecutive_failures,
        2
    );

    // 第二次启动从首选地址重新计数，A 失败后 B 成功
    lifecycle.start().await.unwrap();
    assert_eq!(
        transport.calls()[2..],
        [Call::Register(A.to_string()), Call::Register(B.to_string())]
    );

    lifecycle.stop().await;
}
