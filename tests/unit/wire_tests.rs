use entry_bridge::channel::wire::{
    classify_error, decode_reply, decode_session_created, normalize_resolution,
};
use entry_bridge::models::page::{CaptureType, PathMode};
use entry_bridge::models::suspension::Outcome;
use entry_bridge::AppError;
use serde_json::{json, Value};

#[test]
fn decodes_terminal_page() {
    let body = json!({
        "status": "ok",
        "page": {
            "formName": "PERSON",
            "fields": [
                { "name": "NAME", "captureType": "TextBox" },
                {
                    "name": "SEX",
                    "label": "Sex",
                    "captureType": 1,
                    "responses": [{ "code": 1, "label": "Male" }, { "code": "2", "label": "Female", "color": "#f0f" }],
                    "value": 2
                },
                { "name": "AGE", "captureType": "NumberPad", "occurrences": [2], "inRoster": true, "numeric": true }
            ],
            "currentIndex": 1,
            "pathMode": "operator"
        }
    })
    .to_string();

    let result = decode_reply(&body).expect("decodes");
    let Outcome::Page(page) = result.outcome else {
        panic!("expected page");
    };

    assert_eq!(page.form_name.as_deref(), Some("PERSON"));
    assert_eq!(page.path_mode, PathMode::Operator);
    let sex = page.current_field().expect("current");
    assert_eq!(sex.capture, CaptureType::RadioButton);
    assert_eq!(sex.value, "2");
    assert_eq!(sex.responses[0].code, "1");
    assert_eq!(sex.responses[1].color.as_deref(), Some("#f0f"));
    let age = &page.fields[2];
    assert!(age.in_repeating_group);
    assert_eq!(age.key().occurrence, Some(2));
    assert!(result.notices.is_empty());
}

#[test]
fn top_level_value_lands_on_the_page() {
    let result = decode_reply(r#"{"status":"ok","value":["1001","1002"]}"#).expect("decodes");
    let Outcome::Page(page) = result.outcome else {
        panic!("expected page");
    };
    assert!(page.fields.is_empty());
    assert_eq!(page.value, Some(json!(["1001", "1002"])));
}

#[test]
fn decodes_suspension_with_notices() {
    let body = json!({
        "status": "suspended",
        "interaction": { "name": "choice", "input": { "options": ["Yes", "No"] } },
        "notices": [{ "name": "message", "input": { "message": "hi" } }]
    })
    .to_string();

    let result = decode_reply(&body).expect("decodes");

    assert_eq!(result.notices.len(), 1);
    match result.outcome {
        Outcome::Suspended(s) => assert_eq!(s.name, "choice"),
        Outcome::Page(_) => panic!("expected suspension"),
    }
}

#[test]
fn rejects_malformed_envelopes() {
    for body in [
        r#"{"status":"pending"}"#,
        r#"{"status":"suspended"}"#,
        r#"{"page":{}}"#,
        "not json",
        r#"{"status":"ok","page":{"fields":[{"name":"A"}]}}"#,
        r#"{"status":"ok","page":{"fields":[{"name":"A"}],"currentIndex":3}}"#,
    ] {
        let err = decode_reply(body).expect_err(body);
        assert!(matches!(err, AppError::Protocol(_)), "{body}: {err}");
    }
}

#[test]
fn decodes_session_bootstrap() {
    let id = decode_session_created(r#"{"sessionId":"abc-123"}"#).expect("id");
    assert_eq!(id.as_str(), "abc-123");
    assert!(decode_session_created(r#"{"sessionId":"  "}"#).is_err());
    assert!(decode_session_created("{}").is_err());
}

#[test]
fn classifies_error_bodies() {
    assert!(classify_error(404, "Session not found: abc").is_session_not_found());
    assert!(classify_error(500, "error: SESSION NOT FOUND").is_session_not_found());
    assert!(matches!(
        classify_error(503, "maintenance"),
        AppError::EngineUnavailable(_)
    ));
    match classify_error(400, "bad field") {
        AppError::Transport(msg) => assert_eq!(msg, "400: bad field"),
        other => panic!("expected transport, got {other:?}"),
    }
}

#[test]
fn clips_long_error_bodies() {
    let body = "x".repeat(1000);
    let AppError::Transport(msg) = classify_error(500, &body) else {
        panic!("expected transport");
    };
    assert!(msg.len() < 300);
    assert!(msg.ends_with("..."));
}

#[test]
fn normalizes_nested_result_envelopes() {
    assert_eq!(
        normalize_resolution(json!({ "result": { "result": "2" } })),
        json!("2")
    );
    assert_eq!(normalize_resolution(json!({ "result": null })), Value::Null);
    assert_eq!(
        normalize_resolution(json!({ "result": 1, "extra": true })),
        json!({ "result": 1, "extra": true })
    );
    assert_eq!(normalize_resolution(json!([1, 2])), json!([1, 2]));
}
