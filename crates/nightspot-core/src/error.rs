//! Error taxonomy shared by the engines.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the retrieval and ranking engines.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid provider settings. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A remote embedding call failed (already retried where transient).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A semantic query arrived before any index was built.
    #[error("no similarity index has been built yet")]
    NotIndexed,

    /// Malformed query input, rejected before any computation.
    #[error("invalid input: {0}")]
    Validation(String),
}

/// Classified failure of a remote embedding call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("credential rejected (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("quota exceeded (HTTP {status}): {message}")]
    Quota { status: u16, message: String },

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("request rejected (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Timeouts, connection failures, rate limits (429) and 5xx responses
    /// are transient. Credential and other client errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::Timeout { .. }
                | ProviderError::Quota { .. }
                | ProviderError::Server { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Timeout { timeout_secs: 5 }.is_transient());
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(ProviderError::Server {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!ProviderError::Auth {
            status: 401,
            message: String::new()
        }
        .is_transient());
        assert!(!ProviderError::InvalidResponse("bad".into()).is_transient());
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let err = ProviderError::RetriesExhausted {
            attempts: 3,
            last: Box::new(ProviderError::Timeout { timeout_secs: 5 }),
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains("3 attempts"));
    }
}
