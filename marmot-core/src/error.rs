//! Error normalization.
//!
//! Failures reach the dispatcher from many shapes: service clients,
//! storage, the Discord API, plain strings from command glue. Before a
//! failure is logged or shown to a moderator it is flattened into a
//! [`NormalizedError`]: a stable kind, a message, and at most one level
//! of cause, so the error log stays readable regardless of where the
//! failure originated.

use std::error::Error as StdError;
use std::fmt;

/// A flattened error: kind, message, and at most one level of cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    /// Stable class name of the originating failure ("service",
    /// "storage", ...) or a generic fallback.
    pub kind: String,
    pub message: String,
    pub cause: Option<Box<NormalizedError>>,
}

impl NormalizedError {
    /// Normalize from a kind and a plain message, no cause.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Normalize from any error value, capturing one level of `source()`.
    ///
    /// Deeper chains are intentionally dropped: one cause is enough to
    /// tell a service failure from a transport failure, and the full
    /// chain is still available at the original log site.
    pub fn from_error(kind: impl Into<String>, error: &(dyn StdError + 'static)) -> Self {
        Self {
            kind: kind.into(),
            message: error.to_string(),
            cause: error.source().map(|source| {
                Box::new(NormalizedError {
                    kind: "cause".to_string(),
                    message: source.to_string(),
                    cause: None,
                })
            }),
        }
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {} (cause: {})", self.kind, self.message, cause.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("request failed")]
    struct Outer {
        #[source]
        inner: Inner,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Inner;

    #[test]
    fn test_message_only() {
        let normalized = NormalizedError::new("command", "something broke");
        assert_eq!(normalized.kind, "command");
        assert_eq!(normalized.message, "something broke");
        assert!(normalized.cause.is_none());
        assert_eq!(normalized.to_string(), "command: something broke");
    }

    #[test]
    fn test_captures_one_level_of_cause() {
        let error = Outer { inner: Inner };
        let normalized = NormalizedError::from_error("service", &error);
        assert_eq!(normalized.message, "request failed");
        let cause = normalized.cause.as_ref().unwrap();
        assert_eq!(cause.message, "connection reset");
        assert!(cause.cause.is_none());
        assert_eq!(
            normalized.to_string(),
            "service: request failed (cause: connection reset)"
        );
    }

    #[test]
    fn test_error_without_source_has_no_cause() {
        let normalized = NormalizedError::from_error("service", &Inner);
        assert_eq!(normalized.message, "connection reset");
        assert!(normalized.cause.is_none());
    }
}
