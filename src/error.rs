use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Invalid month key '{0}': expected YYYY-MM")]
    InvalidMonthKey(String),

    #[error("Invalid reference month {0}: must be between 1 and 12")]
    InvalidReferenceMonth(u32),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Flat, user-facing message. Transport details are logged, not carried.
    #[error("{0}")]
    FetchFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
