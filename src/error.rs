use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgriError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data: {0}")]
    NoData(String),
}

pub type Result<T> = std::result::Result<T, AgriError>;
