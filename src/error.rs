//! Error types and handling for the flight risk pipeline

use thiserror::Error;

/// Main error type for the flight risk pipeline
#[derive(Error, Debug)]
pub enum FlightRiskError {
    /// Configuration-related errors, including missing credentials
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A collaborator was never initialised
    #[error("{service} is not available")]
    Unavailable { service: &'static str },

    /// Upstream answered HTTP 429
    #[error("{service} rate limit exceeded: {message}")]
    RateLimited {
        service: &'static str,
        message: String,
    },

    /// Upstream answered with a non-success status
    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Transport-level failure (DNS, connect, timeout)
    #[error("Network error talking to {service}: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    /// Malformed upstream payload or model output
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },
}

impl FlightRiskError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unavailable(service: &'static str) -> Self {
        Self::Unavailable { service }
    }

    pub fn rate_limited<S: Into<String>>(service: &'static str, message: S) -> Self {
        Self::RateLimited {
            service,
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(service: &'static str, status: u16, message: S) -> Self {
        Self::Api {
            service,
            status,
            message: message.into(),
        }
    }

    pub fn network<S: Into<String>>(service: &'static str, message: S) -> Self {
        Self::Network {
            service,
            message: message.into(),
        }
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            FlightRiskError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            FlightRiskError::Unavailable { service } => {
                format!("{service} is currently not available.")
            }
            FlightRiskError::RateLimited { service, .. } => {
                format!("{service} rate limit exceeded. Please try again later.")
            }
            FlightRiskError::Api { .. } | FlightRiskError::Network { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            FlightRiskError::Parse { .. } => {
                "Received an unexpected response from an external service.".to_string()
            }
            FlightRiskError::Validation { message } => {
                format!("Invalid input: {message}")
            }
        }
    }
}
