// tests/delivery_callback.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cmdrelay::channel::{
    InboundResult, OutputLimits, ResultEndpoint, ResultEnvelope, ResultMessage,
};
use cmdrelay::command::{ExecutionCommand, ResultConfig, ResultData};
use cmdrelay::errors::ExecError;
use cmdrelay::receiver::RESULT_TOPIC;
use cmdrelay::types::{DeliveryMode, Errno, ExecutionId, ExecutionState};
use cmdrelay_test_utils::builders::{ConfigBuilder, RequestBuilder};
use cmdrelay_test_utils::fake_host::{run_scripted, ScriptedOutcome};
use cmdrelay_test_utils::{init_tracing, with_timeout, TestRelay};
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn callback_result_reaches_every_local_subscriber_once() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().build());
    let mut first = t.relay.receiver().subscribe();
    let mut second = t.relay.receiver().subscribe();

    let id = t
        .relay
        .manager()
        .execute(RequestBuilder::new("/usr/bin/ls").arg("-la").callback().build())
        .unwrap();
    let mut only_mine = t.relay.receiver().subscribe_for(id);

    let done = t
        .host
        .complete_all(t.relay.reporter(), &ScriptedOutcome::success("total 0\n"));
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id(), id);
    assert_eq!(done[0].state(), ExecutionState::Success);
    assert!(done[0].result_config.delivery_attempted());

    let event = with_timeout(first.recv()).await.unwrap();
    assert_eq!(event.topic, RESULT_TOPIC);
    assert_eq!(event.execution_id, id);
    assert_eq!(event.message.exit_code, Some(0));
    assert_eq!(event.message.stdout, "total 0\n");
    assert!(event.message.is_success());

    let again = with_timeout(second.recv()).await.unwrap();
    assert_eq!(again, event);
    let filtered = with_timeout(only_mine.recv()).await.unwrap();
    assert_eq!(filtered.execution_id, id);

    assert!(matches!(first.try_recv(), Err(TryRecvError::Empty)));
    assert!(t.presenter.is_silent());
    assert_eq!(t.relay.callbacks().pending_count(), 0);
}

#[tokio::test]
async fn second_delivery_attempt_is_refused() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().build());
    let mut rx = t.relay.receiver().subscribe();
    t.relay
        .manager()
        .execute(RequestBuilder::new("/usr/bin/ls").callback().build())
        .unwrap();

    let mut done = t
        .host
        .complete_all(t.relay.reporter(), &ScriptedOutcome::success("x"));
    let cmd = &mut done[0];
    with_timeout(rx.recv()).await.unwrap();

    let err = t.relay.channel().deliver(cmd);
    assert!(matches!(err, Some(ExecError::AlreadyDelivered(id)) if id == cmd.id()));
    assert_eq!(cmd.state(), ExecutionState::Success);
    assert!(cmd.result_data.errors().is_empty());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn long_stdout_is_truncated_with_original_length() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().max_stdout_chars(4000).build());
    let mut rx = t.relay.receiver().subscribe();
    t.relay
        .manager()
        .execute(RequestBuilder::new("/usr/bin/cat").callback().build())
        .unwrap();

    let big = "x".repeat(10_000);
    t.host
        .complete_all(t.relay.reporter(), &ScriptedOutcome::success(&big));

    let event = with_timeout(rx.recv()).await.unwrap();
    assert_eq!(event.message.stdout.len(), 4000);
    assert_eq!(event.message.stdout_original_length, 10_000);
    assert!(event.message.stdout_truncated());
    assert!(!event.message.stderr_truncated());
}

#[test]
fn cancelled_callback_fails_delivery_and_forces_an_alert() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().error_notifications(false).build());
    let id = t
        .relay
        .manager()
        .execute(RequestBuilder::new("/usr/bin/ls").callback().build())
        .unwrap();
    assert!(t.relay.callbacks().cancel(id));

    let done = t
        .host
        .complete_all(t.relay.reporter(), &ScriptedOutcome::success("ignored"));
    let cmd = &done[0];

    assert_eq!(cmd.state(), ExecutionState::Failed);
    let codes: Vec<i32> = cmd.result_data.errors().iter().map(|e| e.code).collect();
    assert_eq!(codes, vec![Errno::DeliveryFailed.code()]);
    assert_eq!(t.presenter.transients().len(), 1);
    assert_eq!(t.presenter.alerts().len(), 1);
}

/// Endpoint whose transport refuses every message.
#[derive(Default)]
struct RefusingEndpoint {
    calls: AtomicUsize,
}

impl ResultEndpoint for RefusingEndpoint {
    fn on_result(&self, _inbound: InboundResult) -> cmdrelay::errors::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExecError::HostRejected("requester transport is closed".to_string()))
    }
}

#[test]
fn endpoint_refusal_fails_delivery_and_forces_an_alert() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().error_notifications(false).build());
    let endpoint = Arc::new(RefusingEndpoint::default());
    let handle = t.relay.callbacks().register(ExecutionId(5), endpoint.clone());
    let mut cmd = ExecutionCommand::new(ExecutionId(5), "/usr/bin/ls", Vec::<String>::new())
        .with_result_config(ResultConfig::callback(handle));
    run_scripted(&mut cmd, &ScriptedOutcome::success("total 0\n"));

    let err = t.relay.reporter().process_result(&mut cmd);
    match err {
        Some(ExecError::DeliveryFailed(msg)) => assert!(msg.contains("rejected"), "got {msg}"),
        other => panic!("Expected DeliveryFailed, got: {:?}", other),
    }
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cmd.state(), ExecutionState::Failed);
    assert!(cmd.result_config.delivery_attempted());
    assert_eq!(cmd.result_data.err_code(), Errno::DeliveryFailed.code());
    assert_eq!(t.relay.callbacks().pending_count(), 0);
    // Notifications are off, but a failed delivery still alerts.
    assert_eq!(t.presenter.transients().len(), 1);
    assert_eq!(t.presenter.alerts().len(), 1);
}

#[test]
fn superseded_registration_cannot_deliver() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().error_notifications(false).build());
    let stale_endpoint = Arc::new(RefusingEndpoint::default());
    let stale = t.relay.callbacks().register(ExecutionId(9), stale_endpoint.clone());
    let current = t
        .relay
        .callbacks()
        .register(ExecutionId(9), Arc::new(RefusingEndpoint::default()));
    assert_eq!(current.execution_id(), ExecutionId(9));

    let mut cmd = ExecutionCommand::new(ExecutionId(9), "/usr/bin/ls", Vec::<String>::new())
        .with_result_config(ResultConfig::callback(stale));
    run_scripted(&mut cmd, &ScriptedOutcome::success(""));

    let err = t.relay.reporter().process_result(&mut cmd);
    match err {
        Some(ExecError::DeliveryFailed(msg)) => assert!(msg.contains("superseded"), "got {msg}"),
        other => panic!("Expected DeliveryFailed, got: {:?}", other),
    }
    assert_eq!(stale_endpoint.calls.load(Ordering::SeqCst), 0);
    assert_eq!(cmd.state(), ExecutionState::Failed);
    assert_eq!(cmd.result_data.err_code(), Errno::DeliveryFailed.code());
    // The newer capability is untouched.
    assert!(t.relay.callbacks().is_pending(ExecutionId(9)));
    assert_eq!(t.presenter.alerts().len(), 1);
}

#[tokio::test]
async fn failed_command_result_is_delivered_without_local_alert() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().build());
    let mut rx = t.relay.receiver().subscribe();
    t.relay
        .manager()
        .execute(RequestBuilder::new("/usr/bin/false").callback().build())
        .unwrap();

    let done = t
        .host
        .complete_all(t.relay.reporter(), &ScriptedOutcome::exit(2, "boom"));
    assert_eq!(done[0].state(), ExecutionState::Failed);

    let event = with_timeout(rx.recv()).await.unwrap();
    assert_eq!(event.message.exit_code, Some(2));
    assert_eq!(event.message.err, Errno::Failed.code());
    assert!(event.message.errmsg.contains("exited with code 2"));
    assert_eq!(event.message.stderr, "boom");
    assert!(t.presenter.is_silent());
}

#[test]
fn delivery_before_execution_is_rejected_without_side_effects() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().build());
    let mut cmd = ExecutionCommand::new(ExecutionId(7), "/bin/true", Vec::<String>::new());

    let err = t.relay.channel().deliver(&mut cmd);
    assert!(matches!(err, Some(ExecError::InvalidInput(_))));
    assert_eq!(cmd.state(), ExecutionState::PreExecution);
    assert!(!cmd.result_config.delivery_attempted());
    assert!(cmd.result_data.errors().is_empty());
}

#[test]
fn fire_and_forget_command_settles_without_delivery() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().build());
    t.relay
        .manager()
        .execute(RequestBuilder::new("/bin/true").build())
        .unwrap();

    let done = t
        .host
        .complete_all(t.relay.reporter(), &ScriptedOutcome::success(""));
    assert_eq!(done[0].result_config.mode(), DeliveryMode::None);
    assert_eq!(done[0].state(), ExecutionState::Success);
    assert!(!done[0].result_config.delivery_attempted());
}

#[test]
fn receiver_drops_unknown_and_malformed_results() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().build());
    let receiver = t.relay.receiver();
    let mut rx = receiver.subscribe();

    let message = ResultMessage::from_result_data(&ResultData::new(), OutputLimits::UNLIMITED);
    let envelope = ResultEnvelope::new(message);

    assert!(!receiver.receive(InboundResult {
        execution_id: Some(ExecutionId(42)),
        envelope: Some(envelope.clone()),
    }));
    assert!(!receiver.receive(InboundResult {
        execution_id: None,
        envelope: Some(envelope.clone()),
    }));

    receiver.expect(ExecutionId(43));
    assert!(!receiver.receive(InboundResult {
        execution_id: Some(ExecutionId(43)),
        envelope: None,
    }));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    assert!(receiver.receive(InboundResult {
        execution_id: Some(ExecutionId(43)),
        envelope: Some(envelope),
    }));
    assert!(rx.try_recv().is_ok());
}

#[test]
fn result_envelope_uses_fixed_keys_and_rejects_unknown_fields() {
    let mut data = ResultData::new();
    data.set_stdout("out");
    data.set_exit_code(0);
    let envelope = ResultEnvelope::new(ResultMessage::from_result_data(&data, OutputLimits::UNLIMITED));

    let json = envelope.to_json().unwrap();
    for key in ["\"version\"", "\"result\"", "\"exitCode\"", "\"stdout_original_length\"", "\"errmsg\""] {
        assert!(json.contains(key), "missing {key} in {json}");
    }
    assert_eq!(ResultEnvelope::from_json(&json).unwrap(), envelope);

    let extra = json.replacen("\"version\"", "\"surprise\": true,\n  \"version\"", 1);
    assert!(matches!(ResultEnvelope::from_json(&extra), Err(ExecError::InvalidInput(_))));

    let future = json.replacen("\"version\": 1", "\"version\": 2", 1);
    assert!(matches!(ResultEnvelope::from_json(&future), Err(ExecError::InvalidInput(_))));
}
