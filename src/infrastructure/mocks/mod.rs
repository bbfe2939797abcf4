//! Test doubles for infrastructure adapters.
//!
//! Always compiled so integration tests and downstream crates can drive the
//! limiter with controlled time.

pub mod clock;

pub use clock::MockClock;
