// tests/failure_reporter.rs

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use cmdrelay::channel::{CallbackRegistry, OutputLimits, PathPolicy, ResultChannel};
use cmdrelay::command::ExecutionCommand;
use cmdrelay::config::NotificationsSection;
use cmdrelay::fs::mock::MockFileSystem;
use cmdrelay::reporter::{FailureReporter, ERROR_ALERT_TITLE, CANCELLED_MESSAGE};
use cmdrelay::types::{Errno, ExecutionId, ExecutionState};
use cmdrelay_test_utils::builders::{ConfigBuilder, RequestBuilder};
use cmdrelay_test_utils::fake_host::{run_scripted, ScriptedOutcome};
use cmdrelay_test_utils::presenter::RecordingPresenter;
use cmdrelay_test_utils::{init_tracing, TestRelay};

fn failed_command(id: u64) -> ExecutionCommand {
    let mut cmd = ExecutionCommand::new(ExecutionId(id), "/usr/bin/make", ["all"]);
    run_scripted(&mut cmd, &ScriptedOutcome::exit(2, "make: *** [all] Error 2"));
    cmd
}

fn reporter_with(enabled: bool) -> (FailureReporter, Arc<RecordingPresenter>) {
    let channel = Arc::new(ResultChannel::new(
        Arc::new(CallbackRegistry::new()),
        Arc::new(MockFileSystem::new()),
        PathPolicy::default(),
        OutputLimits::UNLIMITED,
    ));
    let presenter = Arc::new(RecordingPresenter::new());
    let settings = Arc::new(NotificationsSection {
        error_notifications_enabled: enabled,
    });
    (
        FailureReporter::new(channel, settings, presenter.clone()),
        presenter,
    )
}

#[test]
fn disabled_notifications_suppress_fire_and_forget_errors() {
    init_tracing();
    let (reporter, presenter) = reporter_with(false);
    let mut cmd = failed_command(1);

    assert!(reporter.report_execution_error(&mut cmd, false).is_none());
    assert!(presenter.is_silent());
    assert_eq!(cmd.state(), ExecutionState::Failed);
}

#[test]
fn force_notify_overrides_the_setting() {
    init_tracing();
    let (reporter, presenter) = reporter_with(false);
    let mut cmd = failed_command(1);

    reporter.report_execution_error(&mut cmd, true);
    assert_eq!(presenter.transients().len(), 1);
    let alerts = presenter.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, ERROR_ALERT_TITLE);
    assert!(alerts[0].text.contains("exited with code 2"));
    assert_eq!(alerts[0].report.command_line, "/usr/bin/make all");
    assert_eq!(alerts[0].report.errors.len(), 1);
    assert_eq!(alerts[0].report.environment.crate_name, "cmdrelay");
}

#[test]
fn enabled_notifications_alert_for_fire_and_forget_errors() {
    init_tracing();
    let (reporter, presenter) = reporter_with(true);
    let mut cmd = failed_command(1);

    reporter.report_execution_error(&mut cmd, false);
    assert_eq!(presenter.transients().len(), 1);
    assert_eq!(presenter.alerts().len(), 1);
}

#[test]
fn non_failed_commands_are_ignored() {
    init_tracing();
    let (reporter, presenter) = reporter_with(true);
    let mut cmd = ExecutionCommand::new(ExecutionId(1), "/bin/true", Vec::<String>::new());
    run_scripted(&mut cmd, &ScriptedOutcome::success(""));

    assert!(reporter.report_execution_error(&mut cmd, true).is_none());
    assert!(presenter.is_silent());
    assert_eq!(cmd.state(), ExecutionState::Executed);
}

#[test]
fn repeated_errors_get_distinct_notification_ids() {
    init_tracing();
    let (reporter, presenter) = reporter_with(true);
    for id in 1..=3 {
        let mut cmd = failed_command(id);
        reporter.report_execution_error(&mut cmd, false);
    }

    let ids: HashSet<u64> = presenter
        .alerts()
        .iter()
        .map(|a| a.notification_id)
        .collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn settings_are_read_on_every_report() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().error_notifications(false).build());
    let reporter = t.relay.reporter();

    let mut cmd = failed_command(1);
    reporter.report_execution_error(&mut cmd, false);
    assert!(t.presenter.is_silent());

    t.relay.set_error_notifications_enabled(true);
    let mut cmd = failed_command(2);
    reporter.report_execution_error(&mut cmd, false);
    assert_eq!(t.presenter.alerts().len(), 1);
}

#[test]
fn atomic_bool_is_a_notification_setting() {
    init_tracing();
    let channel = Arc::new(ResultChannel::new(
        Arc::new(CallbackRegistry::new()),
        Arc::new(MockFileSystem::new()),
        PathPolicy::default(),
        OutputLimits::UNLIMITED,
    ));
    let presenter = Arc::new(RecordingPresenter::new());
    let reporter = FailureReporter::new(channel, Arc::new(AtomicBool::new(false)), presenter.clone());

    let mut cmd = failed_command(1);
    reporter.report_execution_error(&mut cmd, false);
    assert!(presenter.is_silent());
}

#[test]
fn cancel_pending_fails_and_delivers_the_result() {
    init_tracing();
    let t = TestRelay::ready(ConfigBuilder::new().build());
    let mut rx = t.relay.receiver().subscribe();
    t.relay
        .manager()
        .execute(RequestBuilder::new("/usr/bin/sleep").arg("100").callback().build())
        .unwrap();

    let mut cmd = t.host.take_submitted().pop().unwrap();
    assert!(t.relay.reporter().cancel_pending(&mut cmd).is_none());

    assert_eq!(cmd.state(), ExecutionState::Failed);
    let errors = cmd.result_data.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, Errno::Cancelled.code());
    assert_eq!(errors[0].message, CANCELLED_MESSAGE);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.execution_id, cmd.id());
    assert_eq!(event.message.err, Errno::Cancelled.code());
    assert_eq!(event.message.exit_code, None);

    // Terminal commands are left alone.
    assert!(t.relay.reporter().cancel_pending(&mut cmd).is_none());
    assert_eq!(cmd.result_data.errors().len(), 1);
}

#[test]
fn process_result_on_unexecuted_command_is_rejected() {
    init_tracing();
    let (reporter, presenter) = reporter_with(true);
    let mut cmd = ExecutionCommand::new(ExecutionId(1), "/bin/true", Vec::<String>::new());

    assert!(reporter.process_result(&mut cmd).is_some());
    assert_eq!(cmd.state(), ExecutionState::PreExecution);
    assert!(presenter.is_silent());
}
