use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// The bare message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Configuration { message }
            | Self::Internal { message }
            | Self::Storage { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("openai", "HTTP 500: upstream unavailable");
        assert_eq!(
            error.to_string(),
            "Provider error: openai - HTTP 500: upstream unavailable"
        );
        assert_eq!(error.message(), "HTTP 500: upstream unavailable");
    }

    #[test]
    fn test_internal_error_message() {
        let error = DomainError::internal("Status event stream closed");
        assert_eq!(error.to_string(), "Internal error: Status event stream closed");
        assert_eq!(error.message(), "Status event stream closed");
    }

    #[test]
    fn test_configuration_error() {
        let error = DomainError::configuration("Provider 'gemini' is not configured");
        assert_eq!(
            error.to_string(),
            "Configuration error: Provider 'gemini' is not configured"
        );
    }
}
