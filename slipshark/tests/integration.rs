// Integration tests
//
// End-to-end tests exercising the full research path:
// chat client → relay router → upstream client → SSE parser → streamed answer
//
// Uses wiremock as the upstream mock, tower::ServiceExt::oneshot for
// in-process HTTP, and a live relay on an ephemeral port for the client.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use slipshark::client::{
    ClientError, RelayReply, RelayTransport, StreamingCallbacks, StreamingClient,
};
use slipshark::config::{self, RelayConfig, StringSource};
use slipshark::proxy;
use slipshark::rate_limit::RateLimiter;
use slipshark::session::{ChatSession, Role, UNAVAILABLE_MESSAGE};
use slipshark::storage::MemoryStore;
use slipshark::upstream::{
    ReqwestUpstreamClient, ResearchRequest, UpstreamClient, UpstreamError, UpstreamResponse,
};
use futures_util::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

const API_KEY: &str = "integration-secret-key";

fn test_yaml(upstream_url: &str) -> String {
    format!(
        r#"slipshark: v1

upstream:
  url: "{upstream_url}/research"
  api_key: "{API_KEY}"
  timeout_ms: 2000

relay:
  path: /api/research
  platform: web

environment: "test"
"#
    )
}

/// Router wired to a wiremock upstream through the real reqwest client.
fn build_test_router(mock_url: &str) -> axum::Router {
    let source = StringSource {
        content: test_yaml(mock_url),
    };
    let config = config::load_config(&source).expect("test config must load");
    let upstream: Arc<dyn UpstreamClient> = Arc::new(ReqwestUpstreamClient::new(
        reqwest::Client::new(),
        &config.upstream,
    ));
    proxy::build_router(upstream, config.relay)
}

/// Upstream that replays fixed network chunks, to control chunk boundaries.
struct ChunkedUpstream {
    status: StatusCode,
    chunks: Vec<&'static str>,
}

#[async_trait]
impl UpstreamClient for ChunkedUpstream {
    async fn open(&self, _request: ResearchRequest) -> Result<UpstreamResponse, UpstreamError> {
        let chunks = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        Ok(UpstreamResponse::streaming(self.status, chunks))
    }
}

/// Upstream that sends one frame, then drops the connection.
struct DroppingUpstream;

#[async_trait]
impl UpstreamClient for DroppingUpstream {
    async fn open(&self, _request: ResearchRequest) -> Result<UpstreamResponse, UpstreamError> {
        let first = stream::iter(vec![Ok(Bytes::from_static(b"data: partial\n\n"))]);
        let reset = stream::once(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err(UpstreamError::Body("connection reset".to_string()))
        });
        Ok(UpstreamResponse {
            status: StatusCode::OK,
            body: Some(Box::pin(first.chain(reset))),
        })
    }
}

/// Serve `router` on an ephemeral local port; returns the relay URL.
async fn spawn_relay(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/research")
}

fn json_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/research")
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[derive(Debug, PartialEq)]
enum Event {
    Chunk(String),
    Error(ClientError),
    Complete(String),
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl StreamingCallbacks for Recorder {
    fn on_chunk(&mut self, chunk: &str) {
        self.events.push(Event::Chunk(chunk.to_string()));
    }
    fn on_error(&mut self, error: ClientError) {
        self.events.push(Event::Error(error));
    }
    fn on_complete(&mut self, full_response: String) {
        self.events.push(Event::Complete(full_response));
    }
}

// ---------------------------------------------------------------------------
// Relay router against a wiremock upstream
// ---------------------------------------------------------------------------

#[tokio::test]
async fn relay_flattens_upstream_sse() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/research"))
        .and(header("X-API-Key", API_KEY))
        .and(body_json(serde_json::json!({
            "query": "best bets tonight",
            "platform": "web"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: Hello\n\ndata:  world\n\ndata: [DONE]\n\n"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = build_test_router(&mock_server.uri());
    let resp = app
        .oneshot(json_request(r#"{"query":"best bets tonight"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    let headers = format!("{:?}", resp.headers());
    let body = body_string(resp).await;
    assert_eq!(body, "Hello world");
    assert!(!body.contains(API_KEY) && !headers.contains(API_KEY));
}

#[tokio::test]
async fn upstream_503_becomes_json_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("data: overloaded\n\n"))
        .mount(&mock_server)
        .await;

    let app = build_test_router(&mock_server.uri());
    let resp = app.oneshot(json_request(r#"{"query":"q"}"#)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json, serde_json::json!({"error": "API request failed"}));
}

#[tokio::test]
async fn unreachable_upstream_is_internal_error() {
    // Port 9 (discard) is essentially never listening on localhost.
    let app = build_test_router("http://127.0.0.1:9");
    let resp = app.oneshot(json_request(r#"{"query":"q"}"#)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["error"], "Internal server error");
}

// ---------------------------------------------------------------------------
// Streaming client against a live relay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_receives_hello_world_across_chunk_splits() {
    let upstream = Arc::new(ChunkedUpstream {
        status: StatusCode::OK,
        chunks: vec!["data: Hel", "lo wor", "ld\n\n"],
    });
    let url = spawn_relay(proxy::build_router(upstream, RelayConfig::default())).await;

    let client = StreamingClient::http(url);
    let mut recorder = Recorder::default();
    client.send_query("q", &mut recorder).await;

    let last = recorder.events.last().unwrap();
    assert_eq!(*last, Event::Complete("Hello world".to_string()));
    assert!(recorder
        .events
        .iter()
        .all(|e| !matches!(e, Event::Error(_))));

    let streamed: String = recorder
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Chunk(c) => Some(c.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, "Hello world");
}

#[tokio::test]
async fn client_sees_503_as_error_only() {
    let upstream = Arc::new(ChunkedUpstream {
        status: StatusCode::SERVICE_UNAVAILABLE,
        chunks: vec!["data: never\n\n"],
    });
    let url = spawn_relay(proxy::build_router(upstream, RelayConfig::default())).await;

    let client = StreamingClient::http(url);
    let mut recorder = Recorder::default();
    client.send_query("q", &mut recorder).await;

    assert_eq!(recorder.events, vec![Event::Error(ClientError::Status(503))]);
}

#[tokio::test]
async fn client_sees_mid_stream_drop_after_partial_content() {
    let url = spawn_relay(proxy::build_router(
        Arc::new(DroppingUpstream),
        RelayConfig::default(),
    ))
    .await;

    let client = StreamingClient::http(url);
    let mut recorder = Recorder::default();
    client.send_query("q", &mut recorder).await;

    assert_eq!(
        recorder.events.first(),
        Some(&Event::Chunk("partial".to_string()))
    );
    assert!(
        matches!(recorder.events.last(), Some(Event::Error(_))),
        "expected a trailing error, got {:?}",
        recorder.events
    );
    assert!(recorder
        .events
        .iter()
        .all(|e| !matches!(e, Event::Complete(_))));
}

#[tokio::test]
async fn session_transcript_from_live_relay() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data: Take the under.\n\n"))
        .mount(&mock_server)
        .await;
    let url = spawn_relay(build_test_router(&mock_server.uri())).await;

    let client = StreamingClient::http(url);
    let mut session = ChatSession::new();
    session.submit_user_message("Lakers total?");
    session.begin_response();
    client.send_query("Lakers total?", &mut session).await;

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::System);
    assert_eq!(messages[1].content, "Take the under.");
    assert!(messages[1].completed);
}

#[tokio::test]
async fn upstream_404_shows_unavailable_notice() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    let url = spawn_relay(build_test_router(&mock_server.uri())).await;

    let client = StreamingClient::http(url);
    let mut session = ChatSession::new();
    session.submit_user_message("q");
    session.begin_response();
    client.send_query("q", &mut session).await;

    assert_eq!(session.messages()[1].content, UNAVAILABLE_MESSAGE);
}

// ---------------------------------------------------------------------------
// Quota gate
// ---------------------------------------------------------------------------

struct CountingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl RelayTransport for CountingTransport {
    async fn post_query(&self, _query: &str) -> Result<RelayReply, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RelayReply::streaming(
            StatusCode::OK,
            vec![Ok(Bytes::from_static(b"answer"))],
        ))
    }
}

#[tokio::test]
async fn exhausted_quota_never_reaches_the_relay() {
    let transport = Arc::new(CountingTransport {
        calls: AtomicUsize::new(0),
    });
    let client = StreamingClient::new(transport.clone());
    let limiter = RateLimiter::new(Arc::new(MemoryStore::new()));
    let mut session = ChatSession::new();

    for i in 0..7 {
        session.submit_user_message(&format!("question {i}"));
        if limiter.try_consume_one().unwrap() {
            session.begin_response();
            client.send_query("q", &mut session).await;
        } else {
            session.record_limit_reached(limiter.daily_limit());
        }
    }

    assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
    assert_eq!(limiter.remaining_queries(), 0);
    let notices = session
        .messages()
        .iter()
        .filter(|m| m.content.starts_with("You've reached your daily limit of 5"))
        .count();
    assert_eq!(notices, 2);
}
