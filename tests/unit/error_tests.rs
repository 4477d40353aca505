use entry_bridge::AppError;

#[test]
fn display_prefixes_each_category() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::EngineUnavailable("down".into()), "engine unavailable: down"),
        (AppError::SessionNotFound("s-1".into()), "session not found: s-1"),
        (AppError::Transport("500: boom".into()), "transport: 500: boom"),
        (AppError::Protocol("junk".into()), "protocol: junk"),
        (AppError::Presenter("closed".into()), "presenter: closed"),
        (AppError::Busy("advance".into()), "busy: advance"),
        (AppError::InvalidState("no session".into()), "invalid state: no session"),
        (AppError::Io("eof".into()), "io: eof"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn only_session_not_found_is_recoverable() {
    assert!(AppError::SessionNotFound(String::new()).is_session_not_found());
    assert!(!AppError::Transport("session not found".into()).is_session_not_found());
}

#[test]
fn fatal_errors_end_the_session() {
    assert!(AppError::EngineUnavailable(String::new()).is_fatal());
    assert!(AppError::Io(String::new()).is_fatal());
    assert!(!AppError::Transport(String::new()).is_fatal());
    assert!(!AppError::InvalidState(String::new()).is_fatal());
}

#[test]
fn conversions_pick_the_right_category() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid");
    assert!(matches!(AppError::from(json_err), AppError::Protocol(_)));

    let toml_err = toml::from_str::<toml::Value>("= nope").expect_err("invalid");
    assert!(matches!(AppError::from(toml_err), AppError::Config(_)));

    let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
    assert!(matches!(AppError::from(io_err), AppError::Io(_)));
}
