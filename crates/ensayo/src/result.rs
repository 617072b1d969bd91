//! Result and error types for Ensayo.

use thiserror::Error;

/// Result type for Ensayo operations
pub type EnsayoResult<T> = Result<T, EnsayoError>;

/// Errors that can occur in Ensayo
#[derive(Debug, Error)]
pub enum EnsayoError {
    /// Element never appeared within the wait-policy bound
    #[error("element {locator} not found within {timeout_ms}ms")]
    NotFoundWithinTimeout {
        /// Locator description
        locator: String,
        /// Wait bound in milliseconds
        timeout_ms: u64,
    },

    /// Element never became interactable within the wait-policy bound
    #[error("element {locator} not clickable within {timeout_ms}ms")]
    NotClickableWithinTimeout {
        /// Locator description
        locator: String,
        /// Wait bound in milliseconds
        timeout_ms: u64,
    },

    /// Session configuration was not recognized (e.g. unknown engine)
    #[error("unsupported configuration: {message}")]
    UnsupportedConfiguration {
        /// What was rejected and why
        message: String,
    },

    /// Underlying browser session failed
    #[error("session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Navigation failed
    #[error("navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Evidence capture or attachment failed
    #[error("evidence error: {message}")]
    Evidence {
        /// Error message
        message: String,
    },

    /// Fixture loading failed
    #[error("fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnsayoError {
    /// Whether this error is one of the two bounded-wait timeouts.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::NotFoundWithinTimeout { .. } | Self::NotClickableWithinTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = EnsayoError::NotFoundWithinTimeout {
            locator: "id=username".to_string(),
            timeout_ms: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("id=username"));
        assert!(msg.contains("10000ms"));
    }

    #[test]
    fn test_not_clickable_display() {
        let err = EnsayoError::NotClickableWithinTimeout {
            locator: "css=button".to_string(),
            timeout_ms: 500,
        };
        assert!(err.to_string().contains("not clickable"));
    }

    #[test]
    fn test_is_timeout() {
        let timeout = EnsayoError::NotFoundWithinTimeout {
            locator: "id=x".to_string(),
            timeout_ms: 1,
        };
        assert!(timeout.is_timeout());

        let config = EnsayoError::UnsupportedConfiguration {
            message: "engine 'safari'".to_string(),
        };
        assert!(!config.is_timeout());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EnsayoError = io.into();
        assert!(matches!(err, EnsayoError::Io(_)));
    }
}
