//! Client identifiers used to partition rate limiting state.
//!
//! A client identifier is typically derived from the originating network
//! address of a request. It is best-effort: several clients behind one proxy
//! share an identifier, and an identifier taken from a client-supplied header
//! is only as trustworthy as the proxy that sets it.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identifier shared by requests that carry no usable client identity.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Error returned when a client identifier cannot be constructed or derived.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientIdError {
    /// The identifier was empty or whitespace only
    #[error("client identifier must not be empty")]
    Empty,
    /// The identifying header was absent from the request
    #[error("request has no `{0}` header")]
    MissingHeader(String),
    /// The identifying header was present but not valid UTF-8
    #[error("request header `{0}` is not a valid client identifier")]
    InvalidHeader(String),
    /// No peer socket address was attached to the request
    #[error("request carries no peer address")]
    NoPeerAddress,
}

/// Identifier of a request source.
///
/// Cheap to clone: the underlying string is reference counted, so the same
/// identifier can key the registry and travel through log fields without
/// reallocating.
///
/// # Example
/// ```
/// use request_throttle::ClientId;
///
/// let id = ClientId::new("  203.0.113.7 ").unwrap();
/// assert_eq!(id.as_str(), "203.0.113.7");
///
/// assert!(ClientId::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Arc<str>);

impl ClientId {
    /// Create a client identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns `ClientIdError::Empty` if nothing is left after trimming.
    pub fn new(raw: &str) -> Result<Self, ClientIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClientIdError::Empty);
        }
        Ok(ClientId(Arc::from(trimmed)))
    }

    /// The shared bucket for unidentified requests, `"unknown"`.
    pub fn unknown() -> Self {
        ClientId(Arc::from(UNKNOWN_CLIENT))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ClientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ClientId {
    type Error = ClientIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ClientId::new(value)
    }
}

impl TryFrom<String> for ClientId {
    type Error = ClientIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ClientId::new(&value)
    }
}
