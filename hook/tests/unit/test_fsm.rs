//! Monitor FSM tests

use renderhook::deploy::fsm::{DeployStatus, MonitorEvent, MonitorFsm, MonitorState};
use renderhook::deploy::outcome::DeployOutcome;

#[test]
fn test_fsm_initial_state() {
    let fsm = MonitorFsm::new();
    assert_eq!(fsm.state(), MonitorState::Polling);
    assert!(fsm.reason().is_none());
    assert_eq!(fsm.checks(), 0);
    assert!(!fsm.state().is_terminal());
}

#[test]
fn test_fsm_live_flow() {
    let mut fsm = MonitorFsm::new();

    for status in ["queued", "build_in_progress", "update_in_progress"] {
        fsm.process(MonitorEvent::Observed(DeployStatus::parse(status)))
            .unwrap();
        assert_eq!(fsm.state(), MonitorState::Polling);
    }

    fsm.process(MonitorEvent::Observed(DeployStatus::parse("live")))
        .unwrap();
    assert_eq!(fsm.state(), MonitorState::Live);
    assert!(fsm.state().is_success());
    assert_eq!(fsm.checks(), 4);
}

#[test]
fn test_fsm_failure_states() {
    for (raw, state) in [
        ("failed", MonitorState::Failed),
        ("canceled", MonitorState::Cancelled),
        ("cancelled", MonitorState::Cancelled),
        ("deactivated", MonitorState::Deactivated),
    ] {
        let mut fsm = MonitorFsm::new();
        fsm.process(MonitorEvent::Observed(DeployStatus::parse(raw)))
            .unwrap();
        assert_eq!(fsm.state(), state);
        assert!(fsm.state().is_terminal());
        assert!(!fsm.state().is_success());
        assert!(fsm.reason().is_some());
    }
}

#[test]
fn test_fsm_attempts_exhausted() {
    let mut fsm = MonitorFsm::new();
    fsm.process(MonitorEvent::Observed(DeployStatus::parse("queued")))
        .unwrap();
    fsm.process(MonitorEvent::AttemptsExhausted).unwrap();

    assert_eq!(fsm.state(), MonitorState::TimedOut);
    assert_eq!(fsm.reason(), Some("no terminal status after 1 checks"));
    assert_eq!(fsm.state().to_string(), "timed_out");
}

#[test]
fn test_fsm_rejects_events_after_terminal_state() {
    let mut fsm = MonitorFsm::new();
    fsm.process(MonitorEvent::Observed(DeployStatus::Live)).unwrap();

    assert!(fsm.process(MonitorEvent::AttemptsExhausted).is_err());
    assert!(fsm
        .process(MonitorEvent::CheckFailed("late".to_string()))
        .is_err());
    assert_eq!(fsm.state(), MonitorState::Live);
    assert_eq!(fsm.checks(), 1);
}

#[test]
fn test_outcome_serializes_state() {
    let mut fsm = MonitorFsm::new();
    fsm.process(MonitorEvent::CheckFailed("502 Bad Gateway".to_string()))
        .unwrap();

    let outcome = DeployOutcome::from_fsm(&fsm, None);
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["state"], "timed_out");
    assert_eq!(value["reason"], "502 Bad Gateway");
    assert_eq!(value["checks"], 1);
}
