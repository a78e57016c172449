//! Property-based tests for task state transitions and bounded domain
//! types.
//!
//! Uses `proptest` to generate random inputs and check invariants the
//! hand-written unit tests colocated with each module only sample a few
//! points of: every in-range value is accepted, every out-of-range value
//! is rejected, and the task state machine never transitions out of a
//! terminal state no matter which target is requested.

use agor::registry::{TaskState, TaskType};
use agor::{Priority, TaskId};
use proptest::prelude::*;

fn arb_task_state() -> impl Strategy<Value = TaskState> {
    prop_oneof![
        Just(TaskState::Pending),
        Just(TaskState::Assigned),
        Just(TaskState::Executing),
        Just(TaskState::Completed),
        Just(TaskState::Failed),
        Just(TaskState::Cancelled),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Critical),
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

proptest! {
    #[test]
    fn terminal_states_accept_no_further_transition(from in arb_task_state(), to in arb_task_state()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }

    #[test]
    fn every_reachable_transition_round_trips_through_a_task(to in arb_task_state()) {
        let mut task = agor::registry::Task::new(TaskType::Build, Priority::Medium, serde_json::json!({}), vec![]);
        let reachable = task.state.can_transition_to(to);
        let result = task.transition_to(to, None);
        prop_assert_eq!(result.is_ok(), reachable);
        if reachable {
            prop_assert_eq!(task.state, to);
        } else {
            prop_assert_eq!(task.state, TaskState::Pending);
        }
    }

    #[test]
    fn priority_ordering_is_reflexive_and_antisymmetric(a in arb_priority(), b in arb_priority()) {
        prop_assert_eq!(a == b, a.cmp(&b) == std::cmp::Ordering::Equal);
        prop_assert_eq!(a < b, b > a);
    }

    #[test]
    fn dependencies_satisfied_iff_every_dependency_reports_complete(
        flags in proptest::collection::vec(any::<bool>(), 0..8),
    ) {
        let deps: Vec<TaskId> = flags.iter().map(|_| TaskId::generate()).collect();
        let completed: std::collections::HashSet<TaskId> = deps
            .iter()
            .zip(&flags)
            .filter(|(_, &done)| done)
            .map(|(id, _)| *id)
            .collect();
        let task = agor::registry::Task::new(TaskType::Validate, Priority::Medium, serde_json::json!({}), deps);

        let all_done = flags.iter().all(|&done| done);
        prop_assert_eq!(task.dependencies_satisfied(&|id| completed.contains(&id)), all_done);
    }

    #[test]
    fn connection_pool_size_accepts_exactly_its_declared_range(n in 0usize..1100) {
        use agor::domain_types::ConnectionPoolSize;
        let result = ConnectionPoolSize::try_new(n);
        prop_assert_eq!(result.is_ok(), (1..=1000).contains(&n));
    }

    #[test]
    fn dedup_set_capacity_accepts_exactly_its_declared_range(n in 0usize..10_000_100) {
        use agor::domain_types::DedupSetCapacity;
        let result = DedupSetCapacity::try_new(n);
        prop_assert_eq!(result.is_ok(), (10_000..=10_000_000).contains(&n));
    }

    #[test]
    fn bridge_max_retries_accepts_exactly_its_declared_range(n in 0u16..20) {
        use agor::domain_types::BridgeMaxRetries;
        let result = BridgeMaxRetries::try_new(n as u8);
        prop_assert_eq!(result.is_ok(), n <= 10);
    }
}
