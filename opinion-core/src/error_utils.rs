use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::SearchServer(e) => {
                error!("Search server error details: {:?}", e);
            }
            CoreError::Document(e) => {
                error!("Document error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::SearchServer(e) => e.user_friendly_message(),
            CoreError::Document(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Could not reach the search server. Please check that Solr is running.".to_string()
            }
            CoreError::InvalidInput { message } => message.clone(),
            CoreError::Timeout { .. } => {
                "The search took too long to complete. Please try again.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::SearchServer(_) => "SEARCH_SERVER".to_string(),
            CoreError::Document(_) => "DOCUMENT".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for SearchServerError {
    fn log_error(&self) -> &Self {
        error!("SearchServerError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("SearchServerError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SearchServerError::Unreachable { url } => {
                format!("The search server at {} could not be reached.", url)
            }
            SearchServerError::ServerError { status_code } => format!(
                "The search server failed with status {}. Please try again later.",
                status_code
            ),
            SearchServerError::RequestRejected { .. } => {
                "The search server rejected the query. Try simpler keywords.".to_string()
            }
            SearchServerError::RequestTimeout => {
                "The search server timed out. Please try again.".to_string()
            }
            SearchServerError::InvalidResponse { .. } => {
                "The search server returned an unexpected response.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            SearchServerError::Unreachable { .. } => "SOLR_UNREACHABLE".to_string(),
            SearchServerError::ServerError { .. } => "SOLR_SERVER_ERROR".to_string(),
            SearchServerError::RequestRejected { .. } => "SOLR_REQUEST_REJECTED".to_string(),
            SearchServerError::InvalidResponse { .. } => "SOLR_INVALID_RESPONSE".to_string(),
            SearchServerError::RequestTimeout => "SOLR_TIMEOUT".to_string(),
        }
    }
}

impl ErrorExt for DocumentError {
    fn log_error(&self) -> &Self {
        error!("DocumentError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DocumentError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            DocumentError::MissingField { id, .. }
            | DocumentError::InvalidLabel { id, .. }
            | DocumentError::InvalidTimestamp { id, .. } => {
                format!("Result {} is incomplete and was left out.", id)
            }
            DocumentError::MissingScore { id, model } => format!(
                "Result {} has no {} score and is left out of the analysis.",
                id, model
            ),
        }
    }

    fn error_code(&self) -> String {
        match self {
            DocumentError::MissingField { .. } => "DOC_MISSING_FIELD".to_string(),
            DocumentError::InvalidLabel { .. } => "DOC_INVALID_LABEL".to_string(),
            DocumentError::InvalidTimestamp { .. } => "DOC_INVALID_TIMESTAMP".to_string(),
            DocumentError::MissingScore { .. } => "DOC_MISSING_SCORE".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is inconsistent: {}.", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
