//! Property tests for the bounded schema poll.

mod common;

use common::*;
use hivestore_plugin::{ReadinessState, ReadinessVerifier};
use hivestore_storage::mock::RecordingBackend;
use proptest::prelude::*;

proptest! {
    #[test]
    fn probes_bounded_by_checks_count(checks in 1u32..20, ready_at in 1usize..30) {
        let backend = RecordingBackend::ready_after(ready_at);
        let timer = RecordingTimer::default();
        let schemas = schema_set();
        let config = fast_config(checks);

        let outcome = tokio_test::block_on(
            ReadinessVerifier::new(&backend, &schemas, &config, &timer).verify(),
        );

        let expected_attempts = (ready_at as u32).min(checks);
        prop_assert_eq!(outcome.attempts, expected_attempts);
        prop_assert_eq!(backend.probe_count(), expected_attempts as usize);
        prop_assert_eq!(timer.sleeps().len(), expected_attempts as usize - 1);

        let expected_state = if ready_at as u32 <= checks {
            ReadinessState::Ready
        } else {
            ReadinessState::Failed
        };
        prop_assert_eq!(outcome.state, expected_state);
    }

    #[test]
    fn plugin_terminates_only_on_exhaustion(checks in 1u32..12, ready_at in 1usize..16) {
        let h = harness(RecordingBackend::ready_after(ready_at), fast_config(checks));

        let result = tokio_test::block_on(h.plugin.after_start());

        let exhausted = ready_at as u32 > checks;
        prop_assert_eq!(result.is_err(), exhausted);
        prop_assert_eq!(h.terminator.codes().len(), usize::from(exhausted));
        prop_assert_eq!(
            h.backend.set_table_schemas_count(),
            usize::from(!exhausted)
        );
    }
}
