//! Deriving client identifiers from HTTP requests.
//!
//! The identifier is read from a forwarded-address header, which is only
//! trustworthy when a reverse proxy under our control sets it. Without such a
//! proxy, clients can pick their own identifier and dodge their limit.

use crate::domain::client::{ClientId, ClientIdError};
use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap, HeaderName};
use std::net::SocketAddr;

/// Default header carrying the client address.
pub const DEFAULT_CLIENT_ID_HEADER: &str = "x-forwarded-for";

/// What to do when a request has no usable identifying header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingClientId {
    /// Put the request in a fixed shared bucket.
    ///
    /// Every header-less client competes for the same allowance.
    Fallback(ClientId),
    /// Use the peer socket address from axum's `ConnectInfo`, failing closed
    /// if the server was not started with connect info.
    PeerAddress,
    /// Fail closed.
    Reject,
}

impl Default for MissingClientId {
    fn default() -> Self {
        MissingClientId::Fallback(ClientId::unknown())
    }
}

/// Resolves the [`ClientId`] of an incoming request.
///
/// Takes the first comma-separated entry of the configured header, which a
/// proxy chain sets to the original client address.
#[derive(Debug, Clone)]
pub struct ClientIdSource {
    header: HeaderName,
    missing: MissingClientId,
}

impl ClientIdSource {
    /// Read identifiers from `header`, falling back to the `"unknown"` bucket.
    pub fn new(header: HeaderName) -> Self {
        Self {
            header,
            missing: MissingClientId::default(),
        }
    }

    /// Set the policy for requests without a usable header.
    pub fn with_missing(mut self, missing: MissingClientId) -> Self {
        self.missing = missing;
        self
    }

    /// The identifying header.
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// The policy for requests without a usable header.
    pub fn missing(&self) -> &MissingClientId {
        &self.missing
    }

    /// Resolve the client of a request from its headers and extensions.
    ///
    /// # Errors
    /// Returns `ClientIdError` when the header is unusable and the policy
    /// does not supply an identifier.
    pub fn resolve(
        &self,
        headers: &HeaderMap,
        extensions: &Extensions,
    ) -> Result<ClientId, ClientIdError> {
        let err = match self.read_header(headers) {
            Ok(id) => return Ok(id),
            Err(err) => err,
        };

        match &self.missing {
            MissingClientId::Fallback(id) => Ok(id.clone()),
            MissingClientId::PeerAddress => extensions
                .get::<ConnectInfo<SocketAddr>>()
                .ok_or(ClientIdError::NoPeerAddress)
                .and_then(|ConnectInfo(addr)| ClientId::new(&addr.ip().to_string())),
            MissingClientId::Reject => Err(err),
        }
    }

    fn read_header(&self, headers: &HeaderMap) -> Result<ClientId, ClientIdError> {
        let value = headers
            .get(&self.header)
            .ok_or_else(|| ClientIdError::MissingHeader(self.header.to_string()))?;
        let value = std::str::from_utf8(value.as_bytes())
            .map_err(|_| ClientIdError::InvalidHeader(self.header.to_string()))?;
        let first = value.split(',').next().unwrap_or_default();
        ClientId::new(first)
    }
}

impl Default for ClientIdSource {
    fn default() -> Self {
        Self::new(HeaderName::from_static(DEFAULT_CLIENT_ID_HEADER))
    }
}
