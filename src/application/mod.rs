//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Rate limit registry (storage of client windows)
//! - Rate limiter (decision making)
//! - Sweeper (periodic removal of idle clients)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the decision logic independent
//! from storage and time sources.

pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod sweeper;
