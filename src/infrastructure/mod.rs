//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Storage implementations (sharded maps with a capacity cap)
//! - HTTP integration (axum middleware and client identification)

pub mod client_id;
pub mod clock;
pub mod eviction;
pub mod http;
pub mod storage;

/// Mock implementations for testing.
///
/// Provides a controllable clock for deterministic tests of window
/// behaviour, from unit tests and integration tests alike.
pub mod mocks;
