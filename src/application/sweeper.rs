//! Background sweeping of idle clients.
//!
//! A fixed-interval task prunes every window and forgets clients with no
//! live timestamps, so registry memory tracks recently active clients only.

use crate::application::limiter::RateLimiter;
use crate::application::ports::Storage;
use crate::domain::{client::ClientId, window::ClientWindow};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SweeperConfigError {
    /// Sweep interval must be greater than zero
    #[error("sweep interval must be greater than 0")]
    ZeroInterval,
}

/// Error returned when a sweeper task does not stop cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// The task panicked while sweeping
    #[error("sweeper task panicked")]
    TaskPanicked,
    /// The task was cancelled before it could observe the shutdown signal
    #[error("sweeper task was cancelled")]
    TaskCancelled,
}

/// Configuration for the background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    interval: Duration,
}

impl SweeperConfig {
    /// Create a sweeper config with the specified interval.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SweeperConfigError> {
        if interval.is_zero() {
            return Err(SweeperConfigError::ZeroInterval);
        }
        Ok(Self { interval })
    }

    /// Time between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Periodically sweeps a rate limiter's registry.
pub struct Sweeper<S>
where
    S: Storage<ClientId, ClientWindow> + Clone,
{
    limiter: RateLimiter<S>,
    config: SweeperConfig,
}

impl<S> Sweeper<S>
where
    S: Storage<ClientId, ClientWindow> + Clone + Send + 'static,
{
    /// Create a sweeper for `limiter`.
    pub fn new(limiter: RateLimiter<S>, config: SweeperConfig) -> Self {
        Self { limiter, config }
    }

    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// The first sweep happens one interval after start. Dropping the
    /// returned handle does not stop the task; call
    /// [`SweeperHandle::shutdown`].
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.config.interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.limiter.sweep_now();
                        debug!(
                            removed,
                            remaining = self.limiter.client_count(),
                            "periodic sweep finished"
                        );
                    }
                    // A dropped sender disables this arm instead of matching
                    Ok(()) = &mut shutdown_rx => {
                        info!("sweeper shutting down");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task to stop and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // A closed receiver means the task already exited
            let _ = tx.send(());
        }

        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) if err.is_panic() => Err(ShutdownError::TaskPanicked),
            Err(_) => Err(ShutdownError::TaskCancelled),
        }
    }

    /// Check whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
