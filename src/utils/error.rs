use chrono::{DateTime, Utc};
use thiserror::Error;

/// 子服務查詢失敗的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupCause {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("unexpected status {status}")]
    Status { status: u16 },

    #[error("malformed response body: {message}")]
    Decode { message: String },
}

/// 非同步查詢未成功完成 (網路錯誤、非 2xx 狀態或無法解析的內容)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to load sub-services for service '{service}': {cause}")]
pub struct LookupFailure {
    pub service: String,
    pub cause: LookupCause,
    pub occurred_at: DateTime<Utc>,
}

impl LookupFailure {
    pub fn new(service: impl Into<String>, cause: LookupCause) -> Self {
        Self {
            service: service.into(),
            cause,
            occurred_at: Utc::now(),
        }
    }

    pub fn transport(service: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::new(
            service,
            LookupCause::Transport {
                message: err.to_string(),
            },
        )
    }

    pub fn status(service: impl Into<String>, status: u16) -> Self {
        Self::new(service, LookupCause::Status { status })
    }

    pub fn decode(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            service,
            LookupCause::Decode {
                message: message.into(),
            },
        )
    }
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error(transparent)]
    Lookup(#[from] LookupFailure),

    #[error("Control not found: no element with id '{id}'")]
    ControlNotFound { id: String },

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl FilterError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FilterError::Lookup(_) | FilterError::HttpClientError(_) => {
                "Check that the lookup endpoint is reachable and returns a JSON list of {id, name} objects"
            }
            FilterError::ControlNotFound { .. } => {
                "Check the configured field ids against the form markup"
            }
            FilterError::IoError(_) => "Check that the file exists and is readable",
            FilterError::SerializationError(_) => "Check the JSON returned by the endpoint",
            FilterError::ConfigError { .. }
            | FilterError::ConfigValidationError { .. }
            | FilterError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command line flags"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FilterError::Lookup(failure) => {
                format!("Could not load sub-services for service '{}'", failure.service)
            }
            FilterError::ControlNotFound { id } => format!("Form field '{}' is missing", id),
            FilterError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_failure_message_names_service() {
        let failure = LookupFailure::status("5", 502);
        assert_eq!(
            failure.to_string(),
            "Failed to load sub-services for service '5': unexpected status 502"
        );
    }

    #[test]
    fn test_lookup_failure_converts_into_filter_error() {
        let err: FilterError = LookupFailure::decode("3", "expected a list").into();
        assert!(matches!(err, FilterError::Lookup(_)));
        assert_eq!(
            err.user_friendly_message(),
            "Could not load sub-services for service '3'"
        );
    }
}
