//! Admission decisions returned by the rate limiter.

/// Outcome of evaluating one request against its client's window.
///
/// A rejection carries the number of whole seconds until the oldest counted
/// request leaves the window and frees a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Admit the request
    Allow,
    /// Reject the request
    Reject {
        /// Seconds until a slot frees up, rounded up
        retry_after_secs: u64,
    },
}

impl RateLimitDecision {
    /// Check if the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allow)
    }

    /// Check if the request was rejected.
    pub fn is_rejected(&self) -> bool {
        !self.is_allowed()
    }

    /// Retry guidance, present only on rejection.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RateLimitDecision::Allow => None,
            RateLimitDecision::Reject { retry_after_secs } => Some(*retry_after_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow() {
        let decision = RateLimitDecision::Allow;
        assert!(decision.is_allowed());
        assert!(!decision.is_rejected());
        assert_eq!(decision.retry_after_secs(), None);
    }

    #[test]
    fn test_reject() {
        let decision = RateLimitDecision::Reject {
            retry_after_secs: 55,
        };
        assert!(!decision.is_allowed());
        assert!(decision.is_rejected());
        assert_eq!(decision.retry_after_secs(), Some(55));
    }
}
