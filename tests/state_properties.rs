// tests/state_properties.rs

use proptest::prelude::*;

use cmdrelay::command::ExecutionCommand;
use cmdrelay::command::result_data::truncate_chars;
use cmdrelay::types::{Errno, ExecutionId, ExecutionState};

fn state_strategy() -> impl Strategy<Value = ExecutionState> {
    prop_oneof![
        Just(ExecutionState::PreExecution),
        Just(ExecutionState::Executing),
        Just(ExecutionState::Executed),
        Just(ExecutionState::Success),
        Just(ExecutionState::Failed),
    ]
}

#[derive(Debug, Clone)]
enum Step {
    Set(ExecutionState),
    Fail(String),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => state_strategy().prop_map(Step::Set),
        1 => "[a-z ]{0,12}".prop_map(Step::Fail),
    ]
}

proptest! {
    // The state never moves backwards and a terminal state is final.
    #[test]
    fn state_is_monotonic_and_terminal_states_stick(
        steps in proptest::collection::vec(step_strategy(), 0..40)
    ) {
        let mut cmd = ExecutionCommand::new(ExecutionId(1), "/bin/true", Vec::<String>::new());
        let mut errors_seen = 0usize;

        for step in steps {
            let before = cmd.state();
            match step {
                Step::Set(next) => {
                    cmd.set_state(next);
                }
                Step::Fail(msg) => {
                    if cmd.set_state_failed(Errno::Failed, msg) {
                        errors_seen += 1;
                    }
                }
            }
            let after = cmd.state();

            prop_assert!(after >= before, "{before} -> {after}");
            if before.is_terminal() {
                prop_assert_eq!(after, before);
            }
            // The error list only grows.
            prop_assert_eq!(cmd.result_data.errors().len(), errors_seen);
        }
    }

    #[test]
    fn truncation_keeps_a_char_prefix(text in "\\PC{0,200}", max in 0usize..250) {
        let cut = truncate_chars(&text, max);
        prop_assert!(text.starts_with(cut));
        prop_assert_eq!(cut.chars().count(), text.chars().count().min(max));
    }
}
