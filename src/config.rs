//! Startup configuration for the rate limited HTTP server.
//!
//! Every option can be given on the command line or through the environment.

use crate::application::limiter::RateLimiter;
use crate::application::sweeper::SweeperConfig;
use crate::domain::client::ClientId;
use crate::error::RateLimitError;
use crate::infrastructure::client_id::{ClientIdSource, MissingClientId};
use crate::infrastructure::http::HttpRateLimit;
use axum::http::HeaderName;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// What the server does with requests lacking the client id header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingClientIdMode {
    /// Share one bucket named by `--fallback-client-id`
    Fallback,
    /// Use the TCP peer address
    Peer,
    /// Reject with 429
    Reject,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "request-throttle-server",
    version,
    about = "HTTP server with per-client sliding-window rate limiting"
)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "SERVER_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Maximum admitted requests per client per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 100)]
    pub rate_limit: usize,

    /// Window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECONDS", default_value_t = 60)]
    pub rate_limit_window_seconds: u64,

    /// Maximum number of tracked clients
    #[arg(long, env = "RATE_LIMIT_MAX_CLIENTS", default_value_t = 10_000)]
    pub max_clients: usize,

    /// Seconds between sweeps of idle clients
    #[arg(long, env = "RATE_LIMIT_SWEEP_INTERVAL_SECONDS", default_value_t = 60)]
    pub sweep_interval_seconds: u64,

    /// Comma separated paths that are never rate limited
    #[arg(
        long,
        env = "RATE_LIMIT_EXCLUDED_PATHS",
        value_delimiter = ',',
        default_value = "/health"
    )]
    pub excluded_paths: Vec<String>,

    /// Header carrying the client address, set by a trusted proxy
    #[arg(long, env = "RATE_LIMIT_CLIENT_ID_HEADER", default_value = "x-forwarded-for")]
    pub client_id_header: String,

    /// Handling of requests without a usable client id header
    #[arg(
        long,
        env = "RATE_LIMIT_MISSING_CLIENT_ID",
        value_enum,
        default_value_t = MissingClientIdMode::Fallback
    )]
    pub missing_client_id: MissingClientIdMode,

    /// Bucket used by the `fallback` mode
    #[arg(long, env = "RATE_LIMIT_FALLBACK_CLIENT_ID", default_value = "unknown")]
    pub fallback_client_id: String,
}

impl ServerConfig {
    /// Build the rate limiter described by this configuration.
    ///
    /// # Errors
    /// Returns `RateLimitError::Build` if a limit parameter is zero.
    pub fn build_limiter(&self) -> Result<RateLimiter, RateLimitError> {
        let limiter = RateLimiter::builder()
            .with_limit(self.rate_limit)
            .with_window(Duration::from_secs(self.rate_limit_window_seconds))
            .with_max_clients(self.max_clients)
            .build()?;
        Ok(limiter)
    }

    /// Sweep schedule described by this configuration.
    ///
    /// # Errors
    /// Returns `RateLimitError::Config` if the interval is zero.
    pub fn sweeper_config(&self) -> Result<SweeperConfig, RateLimitError> {
        SweeperConfig::new(Duration::from_secs(self.sweep_interval_seconds))
            .map_err(|e| RateLimitError::Config(e.to_string()))
    }

    /// Client identification described by this configuration.
    ///
    /// # Errors
    /// Returns `RateLimitError::Config` for an invalid header name or a blank
    /// fallback identifier.
    pub fn client_id_source(&self) -> Result<ClientIdSource, RateLimitError> {
        let header = HeaderName::from_bytes(self.client_id_header.trim().as_bytes()).map_err(|e| {
            RateLimitError::Config(format!(
                "invalid client id header `{}`: {}",
                self.client_id_header, e
            ))
        })?;

        let missing = match self.missing_client_id {
            MissingClientIdMode::Fallback => {
                let id = ClientId::new(&self.fallback_client_id).map_err(|e| {
                    RateLimitError::Config(format!("invalid fallback client id: {}", e))
                })?;
                MissingClientId::Fallback(id)
            }
            MissingClientIdMode::Peer => MissingClientId::PeerAddress,
            MissingClientIdMode::Reject => MissingClientId::Reject,
        };

        Ok(ClientIdSource::new(header).with_missing(missing))
    }

    /// Middleware state wrapping `limiter` with the configured exclusions and
    /// client identification.
    ///
    /// # Errors
    /// See [`ServerConfig::client_id_source`].
    pub fn http_rate_limit(&self, limiter: RateLimiter) -> Result<HttpRateLimit, RateLimitError> {
        Ok(HttpRateLimit::builder(limiter)
            .with_excluded_paths(self.excluded_paths.clone())
            .with_client_id_source(self.client_id_source()?)
            .build())
    }
}
