//! Balancer error types.

use crate::engine::AggregateStatus;
use thiserror::Error;

/// Errors that can occur while registering providers or serving a request.
#[derive(Debug, Error)]
pub enum BalancerError {
    /// Adding the requested items would grow the registry past its bound.
    /// The registry is left unchanged.
    #[error("registry at {current}/{max_capacity} cannot take {incoming} more item(s)")]
    CapacityExceeded {
        /// Number of items currently registered.
        current: usize,
        /// Size of the incoming batch.
        incoming: usize,
        /// Registry bound.
        max_capacity: usize,
    },

    /// The registry is structurally empty or has zero aggregate capacity.
    /// This is not a transient condition and is never retried.
    #[error("no providers available: {0}")]
    NoProvidersAvailable(AggregateStatus),

    /// Every selected provider reported dead until the retry budget ran out.
    #[error("no suitable provider was found after {retries} retries")]
    NoSuitableProvider {
        /// Retry budget that was exhausted.
        retries: u32,
    },
}

/// Result type for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exceeded_display() {
        let err = BalancerError::CapacityExceeded {
            current: 9,
            incoming: 3,
            max_capacity: 10,
        };
        assert_eq!(err.to_string(), "registry at 9/10 cannot take 3 more item(s)");
    }

    #[test]
    fn test_no_suitable_provider_display() {
        let err = BalancerError::NoSuitableProvider { retries: 3 };
        assert_eq!(
            err.to_string(),
            "no suitable provider was found after 3 retries"
        );
    }

    #[test]
    fn test_no_providers_display() {
        let err = BalancerError::NoProvidersAvailable(AggregateStatus {
            providers: 0,
            capacity: 0,
        });
        assert_eq!(
            err.to_string(),
            "no providers available: providers=0, capacity=0"
        );
    }
}
