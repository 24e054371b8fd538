use sea_orm::error::DbErr;
use serde::Serialize;

/// Errors surfaced by the forecasting pipeline.
///
/// "No historical data" is deliberately absent: an empty series is a valid
/// outcome and is reported through [`crate::services::forecasting::ForecastResult::has_data`].
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

impl ServiceError {
    /// Wraps a failure from a history or catalog read.
    pub fn source_unavailable(context: &str, err: impl std::fmt::Display) -> Self {
        ServiceError::SourceUnavailable(format!("{}: {}", context, err))
    }

    /// Wraps a failure from the transactional forecast replace.
    pub fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        ServiceError::PersistenceError(format!("{}: {}", context, err))
    }

    /// Stable machine-readable code, used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ComputationError(_) => "computation_error",
            Self::PersistenceError(_) => "persistence_error",
            Self::SourceUnavailable(_) => "source_unavailable",
        }
    }
}
