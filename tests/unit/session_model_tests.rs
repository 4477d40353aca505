use entry_bridge::models::session::{Session, SessionId, SessionState};

fn session_in(state: SessionState) -> Session {
    let mut session = Session::new(SessionId::from("s-1"));
    session.state = state;
    session
}

#[test]
fn new_session_is_uninitialized() {
    let session = Session::new(SessionId::from("s-1"));
    assert_eq!(session.state, SessionState::Uninitialized);
    assert!(session.application.is_none());
}

#[test]
fn permitted_transitions() {
    use SessionState::{ApplicationLoaded, EntryStarted, Stopped, Uninitialized};

    let allowed = [
        (Uninitialized, ApplicationLoaded),
        (ApplicationLoaded, ApplicationLoaded),
        (ApplicationLoaded, EntryStarted),
        (EntryStarted, Stopped),
        (Stopped, EntryStarted),
        (ApplicationLoaded, Stopped),
    ];
    let denied = [
        (Uninitialized, EntryStarted),
        (Uninitialized, Stopped),
        (EntryStarted, EntryStarted),
        (EntryStarted, ApplicationLoaded),
        (Stopped, Uninitialized),
        (EntryStarted, Uninitialized),
    ];

    for (from, to) in allowed {
        assert!(session_in(from).can_transition_to(to), "{from:?} -> {to:?}");
    }
    for (from, to) in denied {
        assert!(!session_in(from).can_transition_to(to), "{from:?} -> {to:?}");
    }
}

#[test]
fn session_id_is_transparent_json() {
    let id = SessionId::from("abc");
    assert_eq!(serde_json::to_string(&id).expect("json"), "\"abc\"");
    assert_eq!(id.to_string(), "abc");
}
