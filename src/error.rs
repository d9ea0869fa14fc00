use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Insufficient history for forecast: {available} data points available, {required} required")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Anomaly record not found: {0}")]
    AnomalyNotFound(uuid::Uuid),

    #[error("Record store query failed: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
