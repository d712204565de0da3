use admission_gate::app;
use admission_gate::config::GateConfig;
use admission_gate::metrics::HANDLER_LATENCY;
use admission_gate::state::AppState;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn fresh_state() -> Arc<AppState> {
    Arc::new(AppState::new(GateConfig::default()))
}

fn post(uri: &str, ip: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", ip)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn artifact(n: usize) -> String {
    json!({ "name": format!("skill-{n}"), "content": "# prompt" }).to_string()
}

#[tokio::test]
async fn twenty_first_artifact_in_a_minute_is_rate_limited() {
    let app = app(fresh_state());

    for n in 1..=20 {
        let resp = send(&app, post("/api/artifacts", "203.0.113.4", artifact(n))).await;
        assert_eq!(resp.status(), StatusCode::CREATED, "request {n}");
    }

    let resp = send(&app, post("/api/artifacts", "203.0.113.4", artifact(21))).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = resp.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().to_lowercase().contains("too many"));

    // another client is unaffected
    let resp = send(&app, post("/api/artifacts", "203.0.113.5", artifact(22))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn declared_oversize_artifact_is_refused_with_413() {
    let app = app(fresh_state());
    let req = Request::builder()
        .method("POST")
        .uri("/api/artifacts")
        .header("x-forwarded-for", "203.0.113.4")
        .header(header::CONTENT_LENGTH, "700000")
        .body(Body::from(artifact(1)))
        .unwrap();

    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("512000"));
}

#[tokio::test]
async fn upvote_is_once_per_comment_per_client_per_hour() {
    let app = app(fresh_state());

    let mut ids = Vec::new();
    for text in ["first", "second"] {
        let comment = json!({ "skill": "lint", "author": "sam", "body": text }).to_string();
        let resp = send(&app, post("/api/comments", "198.51.100.1", comment)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        ids.push(json_body(resp).await["id"].as_str().unwrap().to_string());
    }

    let uri = format!("/api/comments/{}/upvote", ids[0]);
    let resp = send(&app, post(&uri, "203.0.113.9", Body::empty())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["upvotes"], 1);

    let resp = send(&app, post(&uri, "203.0.113.9", Body::empty())).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key(header::RETRY_AFTER));

    let other = format!("/api/comments/{}/upvote", ids[1]);
    let resp = send(&app, post(&other, "203.0.113.9", Body::empty())).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // a different client may still upvote the first comment
    let resp = send(&app, post(&uri, "203.0.113.10", r#"{"source":"feed"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["upvotes"], 2);
}

#[tokio::test]
async fn ten_kilobyte_comment_is_too_large() {
    let app = app(fresh_state());
    let comment =
        json!({ "skill": "lint", "author": "sam", "body": "x".repeat(10_000) }).to_string();

    let resp = send(&app, post("/api/comments", "203.0.113.4", comment)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().to_lowercase().contains("too large"));
}

#[tokio::test]
async fn invalid_json_is_400_not_413() {
    let app = app(fresh_state());
    let resp = send(&app, post("/api/views", "203.0.113.4", "{\"slug\":")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_writes_still_record_latency() {
    let app = app(fresh_state());

    let before = HANDLER_LATENCY.get_sample_count();
    let resp = send(&app, post("/api/views", "203.0.113.4", "{\"slug\":")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(HANDLER_LATENCY.get_sample_count() > before);

    let before = HANDLER_LATENCY.get_sample_count();
    let resp = send(&app, post("/api/views", "203.0.113.4", r#"{"slug":"lint"}"#)).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert!(HANDLER_LATENCY.get_sample_count() > before);
}

#[tokio::test]
async fn rate_limit_runs_before_the_body_is_parsed() {
    let state = fresh_state();
    let app = app(Arc::clone(&state));
    let sub = |email: &str| json!({ "email": email }).to_string();

    for n in 0..5 {
        let email = sub(&format!("u{n}@example.com"));
        let resp = send(&app, post("/api/subscriptions", "203.0.113.4", email)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    // over quota: even a broken body gets 429, not 400
    let resp = send(&app, post("/api/subscriptions", "203.0.113.4", "not json")).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(state.content.subscriptions.len(), 5);
}

#[tokio::test]
async fn webhook_takes_raw_text_and_dedupes_events() {
    let app = app(fresh_state());
    let event = r#"{"id":"evt_1","type":"checkout.session.completed","data":{}}"#;

    let resp = send(&app, post("/api/webhooks/stripe", "54.187.174.169", event)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first = json_body(resp).await;
    assert_eq!(first["received"], true);
    assert_eq!(first["duplicate"], false);
    assert_eq!(first["event_type"], "checkout.session.completed");

    let resp = send(&app, post("/api/webhooks/stripe", "54.187.174.169", event)).await;
    let again = json_body(resp).await;
    assert_eq!(again["duplicate"], true);
    assert_eq!(again["first_received_at"], first["first_received_at"]);

    // a reused id reports the first delivery, not the new payload
    let reused = r#"{"id":"evt_1","type":"invoice.paid"}"#;
    let resp = send(&app, post("/api/webhooks/stripe", "54.187.174.169", reused)).await;
    let ack = json_body(resp).await;
    assert_eq!(ack["duplicate"], true);
    assert_eq!(ack["event_type"], "checkout.session.completed");

    let huge = "x".repeat(600_001);
    let resp = send(&app, post("/api/webhooks/stripe", "54.187.174.169", huge)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn missing_client_headers_share_the_unknown_bucket() {
    let app = app(fresh_state());
    let anonymous = || {
        Request::builder()
            .method("POST")
            .uri("/api/subscriptions")
            .body(Body::from(json!({ "email": "a@example.com" }).to_string()))
            .unwrap()
    };

    for _ in 0..5 {
        assert_eq!(send(&app, anonymous()).await.status(), StatusCode::CREATED);
    }
    assert_eq!(send(&app, anonymous()).await.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn reset_lets_an_exhausted_client_back_in() {
    let state = fresh_state();
    let app = app(Arc::clone(&state));

    for n in 1..=20 {
        send(&app, post("/api/artifacts", "203.0.113.4", artifact(n))).await;
    }
    let resp = send(&app, post("/api/artifacts", "203.0.113.4", artifact(21))).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    state.limiter.reset();
    let resp = send(&app, post("/api/artifacts", "203.0.113.4", artifact(21))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn upvoting_a_missing_comment_is_404() {
    let app = app(fresh_state());
    let resp = send(&app, post("/api/comments/c-999/upvote", "203.0.113.4", Body::empty())).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_metrics_are_open() {
    let app = app(fresh_state());
    let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let resp = send(&app, get("/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "healthy");

    let resp = send(&app, get("/metrics")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
