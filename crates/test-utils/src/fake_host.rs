use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use cmdrelay::command::ExecutionCommand;
use cmdrelay::connection::{ConnectionListener, ExecutionHost};
use cmdrelay::errors::{ExecError, Result};
use cmdrelay::reporter::FailureReporter;
use cmdrelay::types::{Errno, ExecutionId, ExecutionState};

/// What a fake run of a command produces.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptedOutcome {
    pub fn success(stdout: &str) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn exit(code: i32, stderr: &str) -> Self {
        Self {
            exit_code: code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Move `command` through `Executing` to `Executed`, filling its result data.
///
/// A non-zero exit code is recorded as a command failure.
pub fn run_scripted(command: &mut ExecutionCommand, outcome: &ScriptedOutcome) {
    command.set_state(ExecutionState::Executing);
    command.result_data.set_stdout(outcome.stdout.clone());
    command.result_data.set_stderr(outcome.stderr.clone());
    command.result_data.set_exit_code(outcome.exit_code);
    command.set_state(ExecutionState::Executed);
    if outcome.exit_code != 0 {
        command.set_state_failed(
            Errno::Failed,
            format!("command exited with code {}", outcome.exit_code),
        );
    }
}

/// An execution host that:
/// - records every submitted command instead of running it
/// - can be told to refuse submissions.
#[derive(Debug, Default)]
pub struct FakeHost {
    submitted: Mutex<Vec<ExecutionCommand>>,
    reject: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_submissions(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn submitted_ids(&self) -> Vec<ExecutionId> {
        self.submitted.lock().unwrap().iter().map(|c| c.id()).collect()
    }

    pub fn take_submitted(&self) -> Vec<ExecutionCommand> {
        std::mem::take(&mut *self.submitted.lock().unwrap())
    }

    /// Run every submitted command with `outcome` and hand it to `reporter`,
    /// the way a host does once a process exits. Returns the settled
    /// commands.
    pub fn complete_all(
        &self,
        reporter: &FailureReporter,
        outcome: &ScriptedOutcome,
    ) -> Vec<ExecutionCommand> {
        self.take_submitted()
            .into_iter()
            .map(|mut command| {
                run_scripted(&mut command, outcome);
                if command.is_state_failed() {
                    reporter.report_execution_error(&mut command, false);
                } else {
                    reporter.process_result(&mut command);
                }
                command
            })
            .collect()
    }
}

impl ExecutionHost for FakeHost {
    fn submit(&self, command: ExecutionCommand) -> Result<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ExecError::HostRejected("fake host refuses commands".into()));
        }
        self.submitted.lock().unwrap().push(command);
        Ok(())
    }
}

/// Connection listener that counts its notifications.
#[derive(Debug, Default)]
pub struct CountingListener {
    pub ready: AtomicUsize,
    pub lost: AtomicUsize,
}

impl CountingListener {
    pub fn ready_count(&self) -> usize {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn lost_count(&self) -> usize {
        self.lost.load(Ordering::SeqCst)
    }
}

impl ConnectionListener for CountingListener {
    fn on_ready(&self) {
        self.ready.fetch_add(1, Ordering::SeqCst);
    }

    fn on_lost(&self) {
        self.lost.fetch_add(1, Ordering::SeqCst);
    }
}
