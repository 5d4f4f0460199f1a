use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gateway::{Backend, HttpBackend, exchange};
use proto::{AgentStatus, GatewayError, Phase, ResumeRequest, StartRequest, ThreadId};
use serde_json::{Value, json};
use session::{Applied, ChatSession, MemoryStore};

type Seen = Arc<Mutex<Vec<(String, Value)>>>;

fn pick_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

/// Serves `router` on an ephemeral port and returns its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock backend");
    });
    format!("http://{addr}")
}

/// A research agent that asks one clarifying question, then finishes.
fn research_agent(seen: Seen) -> Router {
    async fn start(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
        seen.lock().unwrap().push(("start".into(), body));
        Json(json!({
            "status": "waiting",
            "message": "Which aspect: **speed** or safety?",
            "thread_id": "thread-42"
        }))
    }

    async fn resume(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
        let thread = body["thread_id"].as_str().unwrap_or_default().to_string();
        seen.lock().unwrap().push(("resume".into(), body));
        Json(json!({
            "status": "complete",
            "message": "**Report**\nRust is fast.",
            "thread_id": thread
        }))
    }

    Router::new()
        .route("/chat/start", post(start))
        .route("/chat/resume", post(resume))
        .route("/health", get(|| async { "ok" }))
        .with_state(seen)
}

#[tokio::test]
async fn start_and_resume_post_the_documented_bodies() {
    let seen = Seen::default();
    let backend = HttpBackend::new(serve(research_agent(seen.clone())).await);

    let reply = backend
        .start(&StartRequest {
            query: "Research Rust".into(),
        })
        .await
        .expect("start reply");
    assert_eq!(reply.status, AgentStatus::Waiting);
    assert_eq!(reply.thread_id, Some(ThreadId::from("thread-42")));

    let reply = backend
        .resume(&ResumeRequest {
            thread_id: ThreadId::from("thread-42"),
            user_response: "speed".into(),
        })
        .await
        .expect("resume reply");
    assert_eq!(reply.status, AgentStatus::Complete);

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0], ("start".to_string(), json!({"query": "Research Rust"})));
    assert_eq!(
        seen[1],
        (
            "resume".to_string(),
            json!({"thread_id": "thread-42", "user_response": "speed"})
        )
    );
}

#[tokio::test]
async fn session_runs_a_full_research_conversation_over_http() {
    let seen = Seen::default();
    let backend = HttpBackend::new(serve(research_agent(seen.clone())).await);
    let mut session = ChatSession::new(MemoryStore::new());
    session.login("ada").unwrap();

    let applied = exchange(&mut session, &backend, "Tell me about Rust programming language")
        .await
        .unwrap();
    assert_eq!(applied, Applied::Active(Phase::Waiting));
    assert_eq!(session.active_chat().unwrap().title, "Tell me about Rust...");

    let applied = exchange(&mut session, &backend, "speed").await.unwrap();
    assert_eq!(applied, Applied::Active(Phase::Complete));
    assert_eq!(session.messages().len(), 4);
    assert_eq!(session.messages()[3].text, "**Report**\nRust is fast.");
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn error_reply_is_returned_even_with_a_failure_status() {
    let router = Router::new().route(
        "/chat/start",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": "model overloaded", "thread_id": null})),
            )
        }),
    );
    let backend = HttpBackend::new(serve(router).await);

    let reply = backend
        .start(&StartRequest { query: "x".into() })
        .await
        .expect("error replies are still replies");
    assert_eq!(reply.status, AgentStatus::Error);
    assert_eq!(reply.message, "model overloaded");
}

#[tokio::test]
async fn non_reply_body_is_an_invalid_response() {
    async fn bad_gateway() -> Response {
        (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>").into_response()
    }
    let base = serve(Router::new().route("/chat/start", post(bad_gateway))).await;
    let backend = HttpBackend::new(base.clone());

    let err = backend
        .start(&StartRequest { query: "x".into() })
        .await
        .unwrap_err();
    match err {
        GatewayError::InvalidResponse { url, reason } => {
            assert_eq!(url, base);
            assert!(reason.contains("502"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn waiting_reply_without_thread_is_an_invalid_response() {
    let router = Router::new().route(
        "/chat/start",
        post(|| async { Json(json!({"status": "waiting", "message": "hm?"})) }),
    );
    let backend = HttpBackend::new(serve(router).await);
    let err = backend
        .start(&StartRequest { query: "x".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse { .. }), "{err:?}");
}

#[tokio::test]
async fn closed_port_is_unreachable_and_names_the_base_url() {
    let base = format!("http://127.0.0.1:{}", pick_free_port());
    let backend = HttpBackend::new(format!("{base}/"));

    let err = backend
        .start(&StartRequest { query: "x".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unreachable { .. }), "{err:?}");
    assert_eq!(err.url(), base);

    let mut session = ChatSession::new(MemoryStore::new());
    session.login("ada").unwrap();
    let applied = exchange(&mut session, &backend, "hello").await.unwrap();
    assert_eq!(applied, Applied::Active(Phase::Idle));
    assert_eq!(
        session.messages()[1].text,
        format!("⚠️ Could not reach the backend at {base}. Is the API server running?")
    );
}

#[tokio::test]
async fn health_reports_status() {
    let seen = Seen::default();
    let backend = HttpBackend::new(serve(research_agent(seen)).await);
    backend.health().await.expect("healthy");

    let base = serve(Router::new().route(
        "/health",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;
    let err = HttpBackend::new(base).health().await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 503, .. }), "{err:?}");
}

#[tokio::test]
async fn timeout_turns_a_slow_backend_into_unreachable() {
    let router = Router::new().route(
        "/chat/start",
        post(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Json(json!({"status": "complete", "message": "late", "thread_id": "t"}))
        }),
    );
    let backend = HttpBackend::with_timeout(
        serve(router).await,
        Some(std::time::Duration::from_millis(200)),
    )
    .unwrap();
    let err = backend
        .start(&StartRequest { query: "x".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unreachable { .. }), "{err:?}");
}
