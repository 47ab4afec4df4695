use proptest::prelude::*;
use scriptweave_core::phase::{allowed_transitions, validate_transition};
use scriptweave_core::{HostOperation, HostPhase, IntegrationState};

fn any_state() -> impl Strategy<Value = IntegrationState> {
    prop_oneof![
        Just(IntegrationState::Scanning),
        Just(IntegrationState::Registering),
        Just(IntegrationState::AwaitingHostCompletion),
        Just(IntegrationState::Resolving),
        Just(IntegrationState::PassthroughProcessing),
        Just(IntegrationState::Done),
    ]
}

#[test]
fn test_happy_path_transitions() {
    use IntegrationState::*;
    let path = [
        Scanning,
        Registering,
        AwaitingHostCompletion,
        Resolving,
        PassthroughProcessing,
        Done,
    ];
    for pair in path.windows(2) {
        assert!(validate_transition(pair[0], pair[1]).is_ok(), "{:?}", pair);
    }
    assert!(validate_transition(Resolving, Done).is_ok());
}

#[test]
fn test_no_state_returns_to_registration() {
    for from in [
        IntegrationState::AwaitingHostCompletion,
        IntegrationState::Resolving,
        IntegrationState::PassthroughProcessing,
        IntegrationState::Done,
    ] {
        assert!(!allowed_transitions(from).contains(&IntegrationState::Registering));
    }
}

#[test]
fn test_each_operation_has_a_legal_phase() {
    for operation in [
        HostOperation::RegisterUnit,
        HostOperation::QueryFinalPath,
        HostOperation::EmitArtifact,
    ] {
        assert!(HostPhase::ALL.iter().any(|p| p.permits(operation)));
    }
    // passthrough emits and queries in the same phase
    assert!(HostPhase::GenerateBundle.permits(HostOperation::EmitArtifact));
    assert!(HostPhase::GenerateBundle.permits(HostOperation::QueryFinalPath));
}

#[cfg(not(feature = "strict-debug"))]
proptest! {
    #[test]
    fn prop_validation_matches_allowed_transitions(from in any_state(), to in any_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }
}

proptest! {
    #[test]
    fn prop_phase_order_is_total(a in 0usize..8, b in 0usize..8) {
        let (pa, pb) = (HostPhase::ALL[a], HostPhase::ALL[b]);
        prop_assert_eq!(a.cmp(&b), pa.cmp(&pb));
    }
}
