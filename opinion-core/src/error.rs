use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Search server error: {0}")]
    SearchServer(#[from] SearchServerError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum SearchServerError {
    #[error("Search server unreachable at {url}")]
    Unreachable { url: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Request rejected with status {status_code}")]
    RequestRejected { status_code: u16 },

    #[error("Invalid search server response: {details}")]
    InvalidResponse { details: String },

    #[error("Request timeout")]
    RequestTimeout,
}

/// A stored record that cannot be turned into a `SearchDocument` or classified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Document {id} is missing field '{field}'")]
    MissingField { id: String, field: String },

    #[error("Document {id} has invalid value '{value}' for '{field}'")]
    InvalidLabel {
        id: String,
        field: String,
        value: String,
    },

    #[error("Document {id} has unparseable timestamp '{value}'")]
    InvalidTimestamp { id: String, value: String },

    #[error("Document {id} has no score for model '{model}'")]
    MissingScore { id: String, model: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            message: message.into(),
        }
    }
}
