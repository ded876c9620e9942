//! External-service clients and background services.

pub mod live_search;
pub mod llm;
pub mod news;
pub mod reminders;
pub mod slow_mode;
pub mod wikipedia;

pub use live_search::LiveSearchClient;
pub use llm::LlmClient;
pub use news::{NewsItem, NewsService, ScoredNewsItem};
pub use reminders::ReminderScheduler;
pub use slow_mode::SlowModeService;
pub use wikipedia::{WikiResult, WikipediaService};

/// Failures from external collaborators (LLM, live search, news feed,
/// encyclopedia lookup).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service has no API key configured
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the remote API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered with nothing usable
    #[error("service response was empty")]
    EmptyResponse,
}

pub type ServiceResult<T> = Result<T, ServiceError>;
