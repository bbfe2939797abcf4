//! # request-throttle
//!
//! Per-client sliding-window rate limiting for HTTP services.
//!
//! Each client, identified by its originating address, may make at most
//! `limit` requests within any window of `window` length. Requests beyond
//! that are rejected with `429 Too Many Requests` and a `Retry-After` header
//! carrying the whole seconds until the client's oldest counted request
//! leaves the window.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use request_throttle::{
//!     rate_limit_middleware, HttpRateLimit, RateLimiter, Sweeper, SweeperConfig,
//! };
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = RateLimiter::builder()
//!     .with_limit(100)
//!     .with_window(Duration::from_secs(60))
//!     .build()?;
//!
//! // Forget clients once all their requests have aged out
//! let sweeper = Sweeper::new(limiter.clone(), SweeperConfig::default()).start();
//!
//! let rate_limit = HttpRateLimit::builder(limiter).build();
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .route("/health", get(|| async { "ok" }))
//!     .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! sweeper.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## How decisions are made
//!
//! For every request the limiter drops the client's timestamps older than
//! the window, then admits and records the request if fewer than `limit`
//! remain. Rejected requests are not recorded, so hammering a closed window
//! does not extend it. A timestamp exactly one window old still counts.
//!
//! Decisions for one client are atomic: concurrent requests from the same
//! client never admit more than `limit` within a window.
//!
//! ## Memory
//!
//! State is kept per client and process-local. Two mechanisms bound it:
//! - **Sweeping** removes clients whose timestamps have all expired, either
//!   from a background [`Sweeper`] or every n-th evaluation
//!   ([`RateLimiterBuilder::with_sweep_every`]).
//! - **Capacity eviction** caps the number of tracked clients (10 000 by
//!   default) by dropping the least recently active one when a new client
//!   arrives.
//!
//! ## Client identity
//!
//! Clients are identified by the first entry of a forwarded-address header
//! (`x-forwarded-for` by default). That header is only meaningful when a
//! trusted reverse proxy sets it. Requests without it go to a shared
//! `"unknown"` bucket, the peer address, or are rejected, depending on
//! [`MissingClientId`].

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

pub mod config;
pub mod error;

// Re-export commonly used types for convenience
pub use domain::{
    client::{ClientId, ClientIdError},
    decision::RateLimitDecision,
    policy::{PolicyError, SlidingWindowPolicy},
    window::ClientWindow,
};

pub use application::{
    limiter::{BuildError, RateLimiter, RateLimiterBuilder},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, EvictionCandidate, EvictionPolicy, Storage},
    registry::RateLimitRegistry,
    sweeper::{ShutdownError, Sweeper, SweeperConfig, SweeperConfigError, SweeperHandle},
};

pub use infrastructure::{
    client_id::{ClientIdSource, MissingClientId},
    clock::SystemClock,
    eviction::LruEviction,
    http::{rate_limit_middleware, HttpRateLimit, HttpRateLimitBuilder},
    storage::ShardedStorage,
};

pub use config::{MissingClientIdMode, ServerConfig};
pub use error::{ErrorResponse, RateLimitError};
