use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Jenkins API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Job does not exist: {0}")]
    JobNotFound(String),

    #[error("Job {job} has no {permalink}")]
    NoBuild { job: String, permalink: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
