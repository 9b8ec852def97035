// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BriefError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BriefError>;
