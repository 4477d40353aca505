//! `HttpChannel` against an in-process fake engine.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, post};
use axum::{Json, Router};
use entry_bridge::channel::http::HttpChannel;
use entry_bridge::channel::OperationChannel;
use entry_bridge::config::GlobalConfig;
use entry_bridge::controller::EntryController;
use entry_bridge::models::operation::Operation;
use entry_bridge::models::session::SessionId;
use entry_bridge::models::suspension::Outcome;
use entry_bridge::presenter::{InteractionPresenter, Resolution};
use entry_bridge::surface::MemorySurface;
use entry_bridge::AppError;
use serde_json::{json, Value};

use super::test_helpers::{settings, ScriptedPresenter};

#[derive(Clone, Default)]
struct FakeEngine {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    body: Value,
    authorization: Option<String>,
    request_id: Option<String>,
}

impl FakeEngine {
    fn record(&self, path: String, headers: &HeaderMap, body: Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        self.requests.lock().unwrap().push(Recorded {
            path,
            body,
            authorization: header("authorization"),
            request_id: header("x-request-id"),
        });
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn page(current: usize) -> Value {
    json!({
        "formName": "PERSON",
        "fields": [
            { "name": "NAME", "label": "Name", "captureType": "TextBox" },
            { "name": "AGE", "label": "Age", "captureType": 6, "numeric": true }
        ],
        "currentIndex": current,
        "pathMode": "system"
    })
}

async fn create_session(
    State(engine): State<FakeEngine>,
    headers: HeaderMap,
) -> Json<Value> {
    engine.record("/sessions".into(), &headers, Value::Null);
    Json(json!({ "sessionId": "abc" }))
}

async fn destroy_session(
    State(engine): State<FakeEngine>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    engine.record(format!("/sessions/{id}"), &headers, Value::Null);
    if id == "gone" {
        (StatusCode::NOT_FOUND, "Session not found".into())
    } else {
        (StatusCode::NO_CONTENT, String::new())
    }
}

async fn invoke(
    State(engine): State<FakeEngine>,
    Path((id, op)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    engine.record(format!("/sessions/{id}/ops/{op}"), &headers, body.clone());
    if id == "gone" {
        return (StatusCode::NOT_FOUND, format!("Session not found: {id}"));
    }
    let reply = match op.as_str() {
        "load-application" => json!({ "status": "ok" }),
        "start" | "submit-interaction" => json!({ "status": "ok", "page": page(0) }),
        "advance" if body["value"] == "999" => json!({
            "status": "suspended",
            "interaction": { "name": "errmsg", "input": { "message": "value too large" } }
        }),
        "advance" => json!({
            "status": "ok",
            "page": page(1),
            "notices": [{ "name": "message", "input": { "message": "saved" } }]
        }),
        "form-structure" => json!({
            "status": "ok",
            "value": {
                "name": "PERSON",
                "fields": [{ "name": "NAME", "label": "Name" }, { "name": "AGE", "label": "Age" }]
            }
        }),
        "eval" => json!({ "status": "ok", "value": 42 }),
        "status" => return (StatusCode::SERVICE_UNAVAILABLE, "engine draining".into()),
        "sort-occurrences" => return (StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
        _ => json!({ "status": "bogus" }),
    };
    (StatusCode::OK, reply.to_string())
}

async fn spawn_engine() -> (SocketAddr, FakeEngine) {
    let engine = FakeEngine::default();
    let app = Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", delete(destroy_session))
        .route("/api/sessions/{id}/ops/{op}", post(invoke))
        .with_state(engine.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, engine)
}

fn config_for(addr: SocketAddr) -> GlobalConfig {
    GlobalConfig::from_toml_str(&format!(
        r#"
[engine]
base_url = "http://{addr}/api/"
application = "census.pff"
request_seconds = 5
"#
    ))
    .expect("config")
}

#[tokio::test]
async fn session_bootstrap_and_authorized_requests() {
    let (addr, engine) = spawn_engine().await;
    let mut config = config_for(addr);
    config.engine.api_token = Some("secret".into());
    let channel = HttpChannel::new(&config).expect("channel");

    let session = channel.create_session().await.expect("session");
    let result = channel
        .invoke(&session, &Operation::Advance { value: "7".into() })
        .await
        .expect("advance");

    assert_eq!(session.as_str(), "abc");
    assert_eq!(result.notices.len(), 1);
    match result.outcome {
        Outcome::Page(page) => {
            assert_eq!(page.form_name.as_deref(), Some("PERSON"));
            assert_eq!(page.current_field().map(|f| f.name.as_str()), Some("AGE"));
        }
        Outcome::Suspended(s) => panic!("unexpected suspension {s:?}"),
    }

    let recorded = engine.recorded();
    assert_eq!(recorded[1].path, "/sessions/abc/ops/advance");
    assert_eq!(recorded[1].body, json!({ "value": "7" }));
    assert!(recorded
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer secret")));
    assert!(recorded.iter().all(|r| r.request_id.is_some()));
}

#[tokio::test]
async fn suspension_envelope_is_decoded() {
    let (addr, _engine) = spawn_engine().await;
    let channel = HttpChannel::new(&config_for(addr)).expect("channel");

    let result = channel
        .invoke(
            &SessionId::from("abc"),
            &Operation::Advance {
                value: "999".into(),
            },
        )
        .await
        .expect("reply");

    match result.outcome {
        Outcome::Suspended(suspension) => {
            assert_eq!(suspension.name, "errmsg");
            assert_eq!(suspension.input["message"], "value too large");
        }
        Outcome::Page(_) => panic!("expected suspension"),
    }
}

#[tokio::test]
async fn error_responses_are_classified() {
    let (addr, _engine) = spawn_engine().await;
    let channel = HttpChannel::new(&config_for(addr)).expect("channel");
    let live = SessionId::from("abc");

    let gone = channel
        .invoke(&SessionId::from("gone"), &Operation::CurrentPage)
        .await
        .expect_err("evicted");
    let unavailable = channel
        .invoke(&live, &Operation::Status)
        .await
        .expect_err("503");
    let transport = channel
        .invoke(&live, &Operation::SortOccurrences)
        .await
        .expect_err("500");
    let protocol = channel
        .invoke(&live, &Operation::CurrentPage)
        .await
        .expect_err("bad status");

    assert!(gone.is_session_not_found());
    assert!(matches!(unavailable, AppError::EngineUnavailable(_)));
    assert!(matches!(transport, AppError::Transport(ref msg) if msg.starts_with("500")));
    assert!(matches!(protocol, AppError::Protocol(_)));
}

#[tokio::test]
async fn refused_connection_and_closed_channel_are_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let refused = HttpChannel::new(&config_for(addr)).expect("channel");
    let err = refused.create_session().await.expect_err("refused");
    assert!(matches!(err, AppError::EngineUnavailable(_)), "got {err:?}");

    let (addr, engine) = spawn_engine().await;
    let closed = HttpChannel::new(&config_for(addr)).expect("channel");
    closed.close();
    let err = closed.create_session().await.expect_err("closed");
    assert!(matches!(err, AppError::EngineUnavailable(_)));
    assert!(engine.recorded().is_empty(), "closed channel sends nothing");
}

#[tokio::test]
async fn destroy_reports_evicted_sessions() {
    let (addr, _engine) = spawn_engine().await;
    let channel = HttpChannel::new(&config_for(addr)).expect("channel");

    channel
        .destroy_session(&SessionId::from("abc"))
        .await
        .expect("destroyed");
    let err = channel
        .destroy_session(&SessionId::from("gone"))
        .await
        .expect_err("gone");
    assert!(err.is_session_not_found());
}

#[tokio::test]
async fn controller_drives_entry_over_http() {
    let (addr, engine) = spawn_engine().await;
    let config = config_for(addr);
    let channel = Arc::new(HttpChannel::new(&config).expect("channel"));
    let presenter = Arc::new(ScriptedPresenter::answering(vec![Resolution::Acknowledged]));
    let mut ctl = EntryController::new(
        channel as Arc<dyn OperationChannel>,
        Arc::clone(&presenter) as Arc<dyn InteractionPresenter>,
        MemorySurface::new(),
        settings(std::time::Duration::from_secs(5)),
    );

    ctl.start_add().await.expect("started");
    let rejected = ctl.submit_typed("999").await.expect("resolved");
    assert_eq!(rejected.current, Some(0), "engine kept NAME current");

    let page = ctl.submit_typed("Ada").await.expect("advanced");
    assert_eq!(page.current, Some(1));
    assert_eq!(ctl.table().records().len(), 2);
    assert_eq!(ctl.table().visited_count(), 2);
    assert_eq!(ctl.evaluate("1 + 41").await.expect("eval"), json!(42));

    ctl.shutdown().await.expect("destroyed");

    let paths: Vec<String> = engine.recorded().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec![
            "/sessions",
            "/sessions/abc/ops/load-application",
            "/sessions/abc/ops/start",
            "/sessions/abc/ops/form-structure",
            "/sessions/abc/ops/advance",
            "/sessions/abc/ops/submit-interaction",
            "/sessions/abc/ops/advance",
            "/sessions/abc/ops/eval",
            "/sessions/abc",
        ]
    );
    assert_eq!(presenter.requests().len(), 2, "errmsg dialog and saved notice");
}
