use entry_bridge::models::suspension::Suspension;
use entry_bridge::presenter::{ChoiceOption, PresentationRequest, Resolution};
use serde_json::{json, Value};

#[test]
fn message_suspensions_become_notices() {
    for name in ["message", "errmsg", "warning", "notice"] {
        let request = PresentationRequest::from_suspension(&Suspension::new(
            name,
            json!({ "title": "Check", "message": "Age out of range", "buttons": ["OK", "Fix"] }),
        ));
        assert_eq!(
            request,
            PresentationRequest::Notice {
                title: Some("Check".into()),
                message: "Age out of range".into(),
                buttons: vec!["OK".into(), "Fix".into()],
            }
        );
    }

    let bare = PresentationRequest::from_suspension(&Suspension::new("errmsg", json!("plain")));
    assert!(matches!(bare, PresentationRequest::Notice { ref message, .. } if message == "plain"));
}

#[test]
fn choice_suspensions_carry_options() {
    let single = PresentationRequest::from_suspension(&Suspension::new(
        "choice",
        json!({
            "title": "Pick",
            "options": ["Yes", { "code": "9", "label": "Don't know", "color": "grey" }],
            "selected": 1,
            "freeText": true
        }),
    ));
    assert_eq!(
        single,
        PresentationRequest::SingleChoice {
            title: "Pick".into(),
            options: vec![
                ChoiceOption::new("1", "Yes"),
                ChoiceOption {
                    code: "9".into(),
                    label: "Don't know".into(),
                    color: Some("grey".into()),
                },
            ],
            preselected: Some(1),
            free_text: true,
        }
    );

    let multi = PresentationRequest::from_suspension(&Suspension::new(
        "select",
        json!({ "options": ["A", "B", "C"], "multiple": true, "selected": [0, 2], "max": 2 }),
    ));
    assert!(matches!(
        multi,
        PresentationRequest::MultiChoice { ref selected, max_selections: Some(2), .. }
            if selected == &vec![0, 2]
    ));
}

#[test]
fn unknown_interactions_pass_through() {
    let input = json!({ "url": "https://example.org" });
    let request = PresentationRequest::from_suspension(&Suspension::new("htmldialog", input.clone()));
    assert_eq!(
        request,
        PresentationRequest::Custom {
            name: "htmldialog".into(),
            input,
        }
    );
    assert_eq!(request.kind(), "custom");
}

#[test]
fn slider_and_date_defaults() {
    let slider = PresentationRequest::from_suspension(&Suspension::new("slider", json!({})));
    assert!(matches!(
        slider,
        PresentationRequest::Slider { min, max, value: None, .. }
            if min.abs() < f64::EPSILON && (max - 100.0).abs() < f64::EPSILON
    ));

    let date = PresentationRequest::from_suspension(&Suspension::new("date", json!({})));
    assert!(matches!(date, PresentationRequest::Date { ref format, .. } if format == "YYYYMMDD"));
}

#[test]
fn resolutions_on_the_wire() {
    assert_eq!(Resolution::Acknowledged.into_wire(), json!({ "acknowledged": true }));
    assert_eq!(Resolution::NoSelection.into_wire(), Value::Null);
    assert_eq!(Resolution::Cancelled.into_wire(), Value::Null);
    assert_eq!(
        Resolution::Value(json!({ "result": [1, 3] })).into_wire(),
        json!([1, 3])
    );
}

#[test]
fn selections_outside_the_option_list_are_dropped() {
    let request = PresentationRequest::from_suspension(&Suspension::new(
        "choice",
        json!({ "multiple": true, "options": ["a", "b"], "selected": [1, 5] }),
    ));
    match request {
        PresentationRequest::MultiChoice { selected, .. } => assert_eq!(selected, vec![1]),
        other => panic!("expected multi choice, got {other:?}"),
    }
}
