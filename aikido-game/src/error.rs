//! Error types for the gamification core.
use thiserror::Error;

/// Validation failures of a mutation request. Nothing is written when one
/// of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GamificationError {
    #[error("amount must be a positive integer (got {0})")]
    InvalidAmount(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unknown technique status `{0}`")]
    InvalidStatus(String),
}

/// Errors raised by [`crate::GamificationEngine`].
#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Rejected(#[from] GamificationError),
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("progress store failure")]
    Store(#[source] E),
}

impl<E> EngineError<E>
where
    E: std::error::Error + 'static,
{
    /// Whether the failure was caused by the request rather than the backend.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::UserNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Backend;

    impl fmt::Display for Backend {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk unplugged")
        }
    }

    impl std::error::Error for Backend {}

    #[test]
    fn messages_name_the_offending_input() {
        assert_eq!(
            GamificationError::InvalidAmount("-5".into()).to_string(),
            "amount must be a positive integer (got -5)"
        );
        assert_eq!(
            GamificationError::MissingField("challengeId").to_string(),
            "missing required field `challengeId`"
        );
    }

    #[test]
    fn engine_error_classifies_client_and_backend_failures() {
        let rejected: EngineError<Backend> = GamificationError::MissingField("status").into();
        assert!(rejected.is_client_error());
        assert!(EngineError::<Backend>::UserNotFound("x".into()).is_client_error());

        let store = EngineError::Store(Backend);
        assert!(!store.is_client_error());
        let source = std::error::Error::source(&store).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("disk unplugged"));
    }
}
