use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The context document exists but could not be parsed. It has been
    /// reinitialized to an empty map (when that was possible).
    #[error("Corrupt context store {path}: {reason}")]
    CorruptStore { path: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

}

pub type Result<T> = std::result::Result<T, Error>;
