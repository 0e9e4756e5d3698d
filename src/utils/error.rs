use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store returned HTTP {status}: {message}")]
    StoreError { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

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

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DiscoveryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::StoreError { .. } => ErrorCategory::Backend,
            Self::Serialization(_) => ErrorCategory::Data,
            Self::Io(_) => ErrorCategory::System,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Transport(_) => ErrorSeverity::Medium,
            Self::StoreError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            Self::StoreError { .. } | Self::Serialization(_) => ErrorSeverity::High,
            Self::Io(_) => ErrorSeverity::Critical,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorSeverity::High,
        }
    }

    /// Whether asking the store again has a reasonable chance of succeeding.
    /// The orchestrator never retries on its own; callers use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::StoreError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Transport(_) => "Check the network connection and retry",
            Self::StoreError { status, .. } if *status == 401 || *status == 403 => {
                "Check the store API key"
            }
            Self::StoreError { .. } => "The data store rejected the query; retry later",
            Self::Serialization(_) => "The data store returned records in an unexpected shape",
            Self::Io(_) => "Check that the file exists and is readable",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the configuration file and try again",
        }
    }

    /// Short message suitable for an error indicator next to stale results.
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => "Unable to reach the server, showing the last results".to_string(),
            ErrorCategory::Backend => "The server could not load points of interest".to_string(),
            ErrorCategory::Data => "Some results could not be read".to_string(),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classification() {
        let unavailable = DiscoveryError::StoreError {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(unavailable.category(), ErrorCategory::Backend);
        assert_eq!(unavailable.severity(), ErrorSeverity::Medium);
        assert!(unavailable.is_retryable());

        let unauthorized = DiscoveryError::StoreError {
            status: 401,
            message: "JWT expired".to_string(),
        };
        assert_eq!(unauthorized.severity(), ErrorSeverity::High);
        assert!(!unauthorized.is_retryable());
        assert_eq!(unauthorized.recovery_suggestion(), "Check the store API key");
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        let err = DiscoveryError::MissingConfigError {
            field: "store.endpoint".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_retryable());
        assert!(err.user_friendly_message().contains("store.endpoint"));
    }
}
