//! axum integration.
//!
//! Wraps a [`RateLimiter`] as middleware for
//! `axum::middleware::from_fn_with_state`. Excluded paths pass through
//! without touching the registry; everything else is evaluated per client
//! and rejected with `429 Too Many Requests` and a computed `Retry-After`.

use crate::application::limiter::RateLimiter;
use crate::domain::client::ClientIdError;
use crate::domain::decision::RateLimitDecision;
use crate::error::RateLimitError;
use crate::infrastructure::client_id::ClientIdSource;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Paths excluded from rate limiting unless configured otherwise.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/health"];

/// Shared middleware state.
///
/// Cheap to clone; clones share the limiter.
///
/// # Example
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use request_throttle::{rate_limit_middleware, HttpRateLimit, RateLimiter};
///
/// let limiter = RateLimiter::builder().with_limit(10).build().unwrap();
/// let rate_limit = HttpRateLimit::builder(limiter)
///     .with_excluded_paths(vec!["/health".to_string(), "/metrics".to_string()])
///     .build();
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "hello" }))
///     .route("/health", get(|| async { "ok" }))
///     .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware));
/// ```
#[derive(Debug, Clone)]
pub struct HttpRateLimit {
    limiter: RateLimiter,
    excluded_paths: Arc<BTreeSet<String>>,
    client_id: Arc<ClientIdSource>,
    fail_closed: Arc<FailClosedLog>,
}

impl HttpRateLimit {
    /// Create a builder around `limiter`.
    pub fn builder(limiter: RateLimiter) -> HttpRateLimitBuilder {
        HttpRateLimitBuilder::new(limiter)
    }

    /// Check whether requests to `path` bypass rate limiting.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.contains(path)
    }

    /// Paths that bypass rate limiting, in sorted order.
    pub fn excluded_paths(&self) -> impl Iterator<Item = &str> {
        self.excluded_paths.iter().map(String::as_str)
    }

    /// The wrapped limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// How clients are identified.
    pub fn client_id_source(&self) -> &ClientIdSource {
        &self.client_id
    }
}

/// Builder for [`HttpRateLimit`].
#[derive(Debug)]
pub struct HttpRateLimitBuilder {
    limiter: RateLimiter,
    excluded_paths: BTreeSet<String>,
    client_id: ClientIdSource,
}

impl HttpRateLimitBuilder {
    fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter,
            excluded_paths: DEFAULT_EXCLUDED_PATHS
                .iter()
                .map(|path| path.to_string())
                .collect(),
            client_id: ClientIdSource::default(),
        }
    }

    /// Replace the excluded paths.
    ///
    /// Paths match the request path exactly. Blank entries are ignored and
    /// duplicates collapse.
    pub fn with_excluded_paths(mut self, paths: Vec<String>) -> Self {
        self.excluded_paths = paths
            .into_iter()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect();
        self
    }

    /// Set how clients are identified.
    pub fn with_client_id_source(mut self, source: ClientIdSource) -> Self {
        self.client_id = source;
        self
    }

    /// Build the middleware state.
    pub fn build(self) -> HttpRateLimit {
        HttpRateLimit {
            limiter: self.limiter,
            excluded_paths: Arc::new(self.excluded_paths),
            client_id: Arc::new(self.client_id),
            fail_closed: Arc::new(FailClosedLog::default()),
        }
    }
}

/// Middleware enforcing the per-client limit.
pub async fn rate_limit_middleware(
    State(rate_limit): State<HttpRateLimit>,
    request: Request,
    next: Next,
) -> Response {
    if rate_limit.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    let client = match rate_limit
        .client_id
        .resolve(request.headers(), request.extensions())
    {
        Ok(client) => client,
        Err(err) => {
            rate_limit.fail_closed.report(&err);
            return RateLimitError::UnidentifiableClient(err).into_response();
        }
    };

    match rate_limit.limiter.check(&client) {
        RateLimitDecision::Allow => next.run(request).await,
        RateLimitDecision::Reject { retry_after_secs } => {
            RateLimitError::RateLimited { retry_after_secs }.into_response()
        }
    }
}

/// Logs each kind of identification failure loudly once, then quietly.
#[derive(Debug, Default)]
struct FailClosedLog {
    empty: AtomicBool,
    missing_header: AtomicBool,
    invalid_header: AtomicBool,
    no_peer_address: AtomicBool,
}

impl FailClosedLog {
    fn report(&self, err: &ClientIdError) {
        let seen = match err {
            ClientIdError::Empty => &self.empty,
            ClientIdError::MissingHeader(_) => &self.missing_header,
            ClientIdError::InvalidHeader(_) => &self.invalid_header,
            ClientIdError::NoPeerAddress => &self.no_peer_address,
        };

        if seen.swap(true, Ordering::Relaxed) {
            debug!(error = %err, "rejecting unidentifiable client");
        } else {
            warn!(
                error = %err,
                "rejecting unidentifiable client; check the client id header and proxy setup"
            );
        }
    }
}
