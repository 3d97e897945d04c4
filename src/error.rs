//! Error types and handling for the SafeCity service

use thiserror::Error;

/// Main error type for the SafeCity service
#[derive(Error, Debug)]
pub enum SafeCityError {
    /// Input validation errors, surfaced to the caller immediately
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A requested resource does not exist upstream
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// An upstream provider answered but refused the request
    #[error("Rejected: {message}")]
    Rejected {
        message: String,
        details: Option<String>,
    },

    /// An upstream provider failed or timed out
    #[error("Upstream error ({service}): {message}")]
    Upstream { service: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Programming defects; never a recoverable condition
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SafeCityError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new rejection carrying the upstream status
    pub fn rejected<S: Into<String>, D: Into<String>>(message: S, details: D) -> Self {
        Self::Rejected {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code the API answers with for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::Rejected { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Upstream { .. }
            | Self::Config { .. }
            | Self::Io { .. }
            | Self::Internal { .. } => 500,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::NotFound { message }
            | Self::Rejected { message, .. }
            | Self::Upstream { message, .. } => message.clone(),
            Self::Config { .. } => {
                "Service is misconfigured. Please check the server configuration.".to_string()
            }
            Self::Io { .. } | Self::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let validation_err = SafeCityError::validation("invalid coordinates");
        assert!(matches!(validation_err, SafeCityError::Validation { .. }));

        let upstream_err = SafeCityError::upstream("openweather", "timeout");
        assert!(matches!(upstream_err, SafeCityError::Upstream { .. }));

        let rejected = SafeCityError::rejected("Geocoding failed", "ZERO_RESULTS");
        assert!(matches!(
            rejected,
            SafeCityError::Rejected { details: Some(ref d), .. } if d == "ZERO_RESULTS"
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(SafeCityError::validation("x").status_code(), 400);
        assert_eq!(SafeCityError::rejected("x", "y").status_code(), 400);
        assert_eq!(SafeCityError::not_found("x").status_code(), 404);
        assert_eq!(SafeCityError::upstream("s", "x").status_code(), 500);
        assert_eq!(SafeCityError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_user_messages() {
        let validation_err = SafeCityError::validation("Latitude is required");
        assert_eq!(validation_err.user_message(), "Latitude is required");

        let upstream_err = SafeCityError::upstream("nominatim", "Failed to reverse geocode coordinates");
        assert_eq!(
            upstream_err.user_message(),
            "Failed to reverse geocode coordinates"
        );

        let internal = SafeCityError::internal("poisoned lock");
        assert!(!internal.user_message().contains("poisoned"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SafeCityError = io_err.into();
        assert!(matches!(err, SafeCityError::Io { .. }));
    }
}
