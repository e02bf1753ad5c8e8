use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubforgeError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing resource: {0}")]
    MissingResource(String),

    #[error("Transcoding engine failed: {0}")]
    Engine(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SubforgeError>;
