//! Suspension resolution: notice draining, chained dialogs, busy guard,
//! and bounded presenter waits.

use std::sync::Arc;
use std::time::Duration;

use entry_bridge::channel::OperationChannel;
use entry_bridge::models::operation::Operation;
use entry_bridge::models::session::SessionId;
use entry_bridge::models::suspension::{OperationResult, Suspension};
use entry_bridge::presenter::console::ConsolePresenter;
use entry_bridge::presenter::{InteractionPresenter, PresentationRequest, Resolution};
use entry_bridge::resolver::{PresenterOutcome, SuspensionResolver};
use entry_bridge::AppError;
use serde_json::{json, Value};

use super::test_helpers::{system_page, ScriptedChannel, ScriptedPresenter};

fn resolver(
    channel: &Arc<ScriptedChannel>,
    presenter: &Arc<ScriptedPresenter>,
    timeout: Duration,
) -> SuspensionResolver {
    SuspensionResolver::new(
        Arc::clone(channel) as Arc<dyn OperationChannel>,
        Arc::clone(presenter) as Arc<dyn InteractionPresenter>,
        timeout,
    )
}

fn advance(value: &str) -> Operation {
    Operation::Advance {
        value: value.into(),
    }
}

fn submitted(op: &Operation) -> Value {
    match op {
        Operation::SubmitInteraction { result } => result.clone(),
        other => panic!("expected submit-interaction, got {other:?}"),
    }
}

#[tokio::test]
async fn terminal_page_returns_without_presenting() {
    let channel = Arc::new(ScriptedChannel::new());
    channel.push_page(system_page(3, 1));
    let presenter = Arc::new(ScriptedPresenter::new());
    let resolver = resolver(&channel, &presenter, Duration::from_secs(5));

    let page = resolver
        .execute(&SessionId::from("s-1"), &advance("John"))
        .await
        .expect("page");

    assert_eq!(page.current, Some(1));
    assert_eq!(channel.op_names(), vec!["advance"]);
    assert!(presenter.requests().is_empty());
    assert!(!resolver.is_busy());
}

#[tokio::test]
async fn notices_are_shown_in_order_before_the_page() {
    let channel = Arc::new(ScriptedChannel::new());
    channel.push(Ok(OperationResult::page(system_page(2, 0)).with_notices(vec![
        Suspension::new("message", json!({ "message": "first" })),
        Suspension::new("warning", json!({ "message": "second" })),
    ])));
    let presenter = Arc::new(ScriptedPresenter::new());
    let resolver = resolver(&channel, &presenter, Duration::from_secs(5));

    resolver
        .execute(&SessionId::from("s-1"), &Operation::CurrentPage)
        .await
        .expect("page");

    let messages: Vec<String> = presenter
        .requests()
        .into_iter()
        .map(|request| match request {
            PresentationRequest::Notice { message, .. } => message,
            other => panic!("expected notice, got {other:?}"),
        })
        .collect();
    assert_eq!(messages, vec!["first", "second"]);
    assert_eq!(channel.op_names(), vec!["current-page"], "notices never submit");
}

#[tokio::test]
async fn chained_suspensions_resolve_in_a_loop() {
    let channel = Arc::new(ScriptedChannel::new());
    channel
        .push(Ok(OperationResult::suspended(Suspension::new(
            "errmsg",
            json!({ "message": "out of range" }),
        ))))
        .push(Ok(OperationResult::suspended(Suspension::new(
            "choice",
            json!({ "title": "Continue?", "options": ["Yes", "No"] }),
        ))))
        .push_page(system_page(4, 2));
    let presenter = Arc::new(ScriptedPresenter::answering(vec![
        Resolution::Acknowledged,
        Resolution::Value(json!({ "result": { "result": 1 } })),
    ]));
    let resolver = resolver(&channel, &presenter, Duration::from_secs(5));

    let page = resolver
        .execute(&SessionId::from("s-1"), &advance("999"))
        .await
        .expect("page");

    assert_eq!(page.current, Some(2));
    let ops = channel.operations();
    assert_eq!(
        channel.op_names(),
        vec!["advance", "submit-interaction", "submit-interaction"]
    );
    assert_eq!(submitted(&ops[1]), json!({ "acknowledged": true }));
    assert_eq!(submitted(&ops[2]), json!(1), "nested result envelopes unwrap");
    assert!(channel.sessions_used().iter().all(|s| s.as_str() == "s-1"));
}

#[tokio::test]
async fn roster_end_choice_reaches_the_next_field() {
    let channel = Arc::new(ScriptedChannel::new());
    channel
        .push(Ok(OperationResult::suspended(Suspension::new(
            "choice",
            json!({ "title": "Add another member?", "options": ["Yes", "No"] }),
        ))))
        .push_page(system_page(6, 5));
    let presenter = Arc::new(ScriptedPresenter::answering(vec![Resolution::Value(json!(1))]));
    let resolver = resolver(&channel, &presenter, Duration::from_secs(5));

    let page = resolver
        .execute(&SessionId::from("s-1"), &advance("42"))
        .await
        .expect("page");

    assert_eq!(page.current_field().map(|f| f.name.as_str()), Some("F5"));
    assert_eq!(submitted(&channel.operations()[1]), json!(1));
    match &presenter.requests()[0] {
        PresentationRequest::SingleChoice { options, .. } => {
            assert_eq!(options.len(), 2);
            assert_eq!(options[0].label, "Yes");
        }
        other => panic!("expected single choice, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_and_failed_dialogs_submit_no_selection() {
    let channel = Arc::new(ScriptedChannel::new());
    channel
        .push(Ok(OperationResult::suspended(Suspension::new("choice", json!({})))))
        .push(Ok(OperationResult::suspended(Suspension::new("select", json!({})))))
        .push_page(system_page(1, 0));
    let presenter = Arc::new(ScriptedPresenter::new());
    presenter.push(Resolution::Cancelled);
    presenter.push_error(AppError::Presenter("window closed".into()));
    let resolver = resolver(&channel, &presenter, Duration::from_secs(5));

    resolver
        .execute(&SessionId::from("s-1"), &advance("x"))
        .await
        .expect("page");

    let ops = channel.operations();
    assert_eq!(submitted(&ops[1]), Value::Null);
    assert_eq!(submitted(&ops[2]), Value::Null);
}

#[tokio::test]
async fn presenter_timeout_acknowledges() {
    let channel = Arc::new(ScriptedChannel::new());
    channel
        .push(Ok(OperationResult::suspended(Suspension::new(
            "message",
            json!({ "message": "saved" }),
        ))))
        .push_page(system_page(1, 0));
    let presenter = Arc::new(ScriptedPresenter::slow(Duration::from_secs(10)));
    presenter.push(Resolution::Cancelled);
    let resolver = resolver(&channel, &presenter, Duration::from_millis(50));

    resolver
        .execute(&SessionId::from("s-1"), &Operation::EndCase)
        .await
        .expect("page");

    assert_eq!(
        submitted(&channel.operations()[1]),
        json!({ "acknowledged": true })
    );
}

#[tokio::test]
async fn show_reports_timeout() {
    let channel = Arc::new(ScriptedChannel::new());
    let presenter = Arc::new(ScriptedPresenter::slow(Duration::from_secs(10)));
    let resolver = resolver(&channel, &presenter, Duration::from_millis(20));

    let outcome = resolver
        .show(PresentationRequest::Notice {
            title: None,
            message: "hello".into(),
            buttons: Vec::new(),
        })
        .await;

    assert_eq!(outcome, PresenterOutcome::TimedOut);
}

#[tokio::test]
async fn second_operation_while_busy_is_rejected() {
    let channel = Arc::new(ScriptedChannel::with_delay(Duration::from_millis(100)));
    channel.push_page(system_page(2, 1));
    let presenter = Arc::new(ScriptedPresenter::new());
    let resolver = resolver(&channel, &presenter, Duration::from_secs(5));
    let session = SessionId::from("s-1");

    let op_a = advance("a");
    let op_b = advance("b");
    let first = resolver.execute(&session, &op_a);
    let second = async {
        tokio::task::yield_now().await;
        resolver.execute(&session, &op_b).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::Busy(_))));
    assert_eq!(channel.op_names(), vec!["advance"], "busy call never reaches the channel");
    assert!(!resolver.is_busy(), "flag clears after completion");
}

#[tokio::test]
async fn busy_flag_clears_after_channel_error() {
    let channel = Arc::new(ScriptedChannel::new());
    channel.push(Err(AppError::Transport("500: boom".into())));
    let presenter = Arc::new(ScriptedPresenter::new());
    let resolver = resolver(&channel, &presenter, Duration::from_secs(5));

    let err = resolver
        .execute(&SessionId::from("s-1"), &advance("a"))
        .await
        .expect_err("transport error");

    assert!(matches!(err, AppError::Transport(_)));
    assert!(!resolver.is_busy());
}

#[tokio::test]
async fn stale_engine_selection_on_the_console_submits_no_codes() {
    let channel = Arc::new(ScriptedChannel::new());
    channel
        .push(Ok(OperationResult::suspended(Suspension::new(
            "choice",
            json!({ "multiple": true, "options": ["a", "b"], "selected": [5] }),
        ))))
        .push_page(system_page(2, 1));
    let console = Arc::new(ConsolePresenter::new(&b"\n"[..], Vec::new()));
    let resolver = SuspensionResolver::new(
        Arc::clone(&channel) as Arc<dyn OperationChannel>,
        console as Arc<dyn InteractionPresenter>,
        Duration::from_secs(5),
    );

    let page = resolver
        .execute(&SessionId::from("s-1"), &advance("x"))
        .await
        .expect("page");

    assert_eq!(page.current, Some(1));
    let ops = channel.operations();
    assert_eq!(submitted(&ops[1]), json!([]));
}
