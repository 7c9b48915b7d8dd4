use catalog_store::{KeywordError, RankingError, StoreError};
use text_generation::generator::GenerationError;

/// Caller-facing failure kinds. Each kind stays distinct all the way out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Absent or soft-deleted.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("ranking unavailable: {0}")]
    RankingUnavailable(String),
    /// Text-generation collaborator failed.
    #[error("text generation unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("config error: {0}")]
    Config(String),
}

impl ServiceError {
    /// HTTP-equivalent status for the kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::InvalidRequest(_) => 400,
            ServiceError::StoreUnavailable(_)
            | ServiceError::RankingUnavailable(_)
            | ServiceError::ServiceUnavailable(_) => 503,
            ServiceError::Store(_) | ServiceError::Config(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::StoreUnavailable(_)
                | ServiceError::RankingUnavailable(_)
                | ServiceError::ServiceUnavailable(_)
        )
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            other => ServiceError::Store(other.to_string()),
        }
    }
}

impl From<RankingError> for ServiceError {
    fn from(err: RankingError) -> Self {
        match err {
            RankingError::Unavailable(msg) => ServiceError::RankingUnavailable(msg),
        }
    }
}

impl From<KeywordError> for ServiceError {
    fn from(err: KeywordError) -> Self {
        match err {
            KeywordError::NoMatchFound(words) => {
                ServiceError::NotFound(format!("no catalog item matches {words:?}"))
            }
            KeywordError::Store(e) => e.into(),
        }
    }
}

impl From<GenerationError> for ServiceError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::EmptyPrompt | GenerationError::PromptTooLong { .. } => {
                ServiceError::InvalidRequest(err.to_string())
            }
            GenerationError::ServiceUnavailable { message } => ServiceError::ServiceUnavailable(message),
            GenerationError::InvalidConfiguration { message } => ServiceError::ServiceUnavailable(message),
        }
    }
}
