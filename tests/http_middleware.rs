//! Integration tests for the axum middleware.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::{middleware, routing::get, Router};
use request_throttle::{
    rate_limit_middleware, ClientId, ClientIdSource, ErrorResponse, HttpRateLimit, MissingClientId,
    RateLimiter,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceExt;

fn limiter(limit: usize) -> RateLimiter {
    RateLimiter::builder()
        .with_limit(limit)
        .with_window(Duration::from_secs(60))
        .build()
        .unwrap()
}

fn app(rate_limit: HttpRateLimit) -> Router {
    Router::new()
        .route("/", get(|| async { "hello" }))
        .route("/health", get(|| async { "ok" }))
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware))
}

fn request(path: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(value) = forwarded_for {
        builder = builder.header("x-forwarded-for", value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> ErrorResponse {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_admits_until_limit_then_rejects_with_retry_after() {
    let rate_limit = HttpRateLimit::builder(limiter(2)).build();
    let app = app(rate_limit);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request("/", Some("203.0.113.5")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request("/", Some("203.0.113.5")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((59..=60).contains(&retry_after), "retry after {}", retry_after);

    let body = body_json(response).await;
    assert_eq!(body.error, "Too Many Requests");
}

#[tokio::test]
async fn test_clients_limited_independently() {
    let app = app(HttpRateLimit::builder(limiter(1)).build());

    let first = app.clone().oneshot(request("/", Some("198.51.100.1"))).await.unwrap();
    let second = app.clone().oneshot(request("/", Some("198.51.100.2"))).await.unwrap();
    let repeat = app.clone().oneshot(request("/", Some("198.51.100.1"))).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_excluded_path_leaves_state_untouched() {
    let limiter = limiter(1);
    let app = app(HttpRateLimit::builder(limiter.clone()).build());

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(request("/health", Some("192.0.2.10")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(limiter.client_count(), 0);
    assert_eq!(limiter.metrics().snapshot().total_requests(), 0);

    // The client's first limited request is still admitted
    let response = app.oneshot(request("/", Some("192.0.2.10"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_uses_first_entry() {
    let limiter = limiter(5);
    let app = app(HttpRateLimit::builder(limiter.clone()).build());

    app.oneshot(request("/", Some("203.0.113.77, 10.0.0.1")))
        .await
        .unwrap();

    assert!(limiter.tracks(&ClientId::new("203.0.113.77").unwrap()));
    assert!(!limiter.tracks(&ClientId::new("10.0.0.1").unwrap()));
}

#[tokio::test]
async fn test_missing_header_shares_fallback_bucket() {
    let limiter = limiter(1);
    let app = app(HttpRateLimit::builder(limiter.clone()).build());

    let first = app.clone().oneshot(request("/", None)).await.unwrap();
    let second = app.clone().oneshot(request("/", None)).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limiter.tracks(&ClientId::unknown()));
}

#[tokio::test]
async fn test_reject_policy_fails_closed() {
    let limiter = limiter(10);
    let rate_limit = HttpRateLimit::builder(limiter.clone())
        .with_client_id_source(ClientIdSource::default().with_missing(MissingClientId::Reject))
        .build();
    let app = app(rate_limit);

    let response = app.clone().oneshot(request("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(header::RETRY_AFTER).is_none());

    let body = body_json(response).await;
    assert_eq!(body.error, "Unidentifiable Client");
    assert_eq!(limiter.client_count(), 0);

    // Excluded paths still pass
    let response = app.oneshot(request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_peer_address_policy() {
    let limiter = limiter(10);
    let rate_limit = HttpRateLimit::builder(limiter.clone())
        .with_client_id_source(
            ClientIdSource::default().with_missing(MissingClientId::PeerAddress),
        )
        .build();
    let app = app(rate_limit);

    // Without connect info the request cannot be attributed
    let response = app.clone().oneshot(request("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let mut with_peer = request("/", None);
    with_peer
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 200], 40000))));
    let response = app.oneshot(with_peer).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(limiter.tracks(&ClientId::new("192.0.2.200").unwrap()));
}

#[tokio::test]
async fn test_custom_excluded_paths_replace_defaults() {
    let limiter = limiter(1);
    let rate_limit = HttpRateLimit::builder(limiter.clone())
        .with_excluded_paths(vec!["/".to_string()])
        .build();
    let app = app(rate_limit);

    for _ in 0..3 {
        let response = app.clone().oneshot(request("/", Some("192.0.2.1"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let first = app.clone().oneshot(request("/health", Some("192.0.2.1"))).await.unwrap();
    let second = app.oneshot(request("/health", Some("192.0.2.1"))).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
