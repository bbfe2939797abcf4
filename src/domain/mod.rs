//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of the rate limiter:
//! - Client identifiers
//! - Per-client sliding windows of request timestamps
//! - The sliding-window admission policy
//! - Admission decisions with retry guidance
//!
//! All types in this layer are pure and take the current instant as an
//! argument, so they are deterministic under test.

pub mod client;
pub mod decision;
pub mod policy;
pub mod window;
