//! Bot error taxonomy.
//!
//! Commands raise only their intentional domain signals; everything else
//! propagates with `?` and is caught exactly once by the dispatcher,
//! which normalizes and logs it. The process never exits because a
//! command failed.

use marmot_core::NormalizedError;

use crate::services::ServiceError;

/// Failures surfaced during command dispatch or execution.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Slash-path domain failure
    #[error("{0}")]
    Command(String),

    /// Message-path domain failure
    #[error("{0}")]
    Message(String),

    /// External-service failure
    #[error("service error")]
    Service(#[from] ServiceError),

    /// Persistence failure
    #[error("storage error")]
    Storage(#[from] marmot_db::DbError),

    /// Discord API failure
    #[error("discord error")]
    Discord(#[from] serenity::Error),
}

impl BotError {
    /// Stable class name used for error normalization and logging.
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::Command(_) => "command",
            BotError::Message(_) => "message",
            BotError::Service(_) => "service",
            BotError::Storage(_) => "storage",
            BotError::Discord(_) => "discord",
        }
    }

    /// Flatten for the error log: kind plus one level of cause.
    pub fn normalized(&self) -> NormalizedError {
        match self {
            BotError::Command(message) => NormalizedError::new(self.kind(), message),
            BotError::Message(message) => NormalizedError::new(self.kind(), message),
            _ => NormalizedError::from_error(self.kind(), self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_normalize_without_cause() {
        let normalized = BotError::Command("LLM is not configured".to_string()).normalized();
        assert_eq!(normalized.kind, "command");
        assert_eq!(normalized.message, "LLM is not configured");
        assert!(normalized.cause.is_none());
    }

    #[test]
    fn test_wrapped_errors_keep_one_level_of_cause() {
        let error = BotError::Service(ServiceError::EmptyResponse);
        let normalized = error.normalized();
        assert_eq!(normalized.kind, "service");
        assert_eq!(normalized.message, "service error");
        let cause = normalized.cause.unwrap();
        assert_eq!(cause.message, ServiceError::EmptyResponse.to_string());
        assert!(cause.cause.is_none());
    }

    #[test]
    fn test_kind_names_are_stable() {
        assert_eq!(BotError::Message("x".into()).kind(), "message");
        assert_eq!(
            BotError::Storage(marmot_db::DbError::Migration("m".into())).kind(),
            "storage"
        );
    }
}
