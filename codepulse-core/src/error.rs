//! Error types for CodePulse core.

use std::io;

use thiserror::Error;

/// Error type for CodePulse core operations.
#[derive(Debug, Error)]
pub enum CodePulseError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A JSON payload could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A glob or regex pattern in a rule table failed to compile.
    #[error("invalid pattern `{pattern}`: {message}")]
    Pattern {
        /// The offending pattern text.
        pattern: String,
        /// Compiler message.
        message: String,
    },
    /// A catch-all error with a message.
    #[error("{0}")]
    Other(String),
}

/// Convenience result type for CodePulse core.
pub type Result<T> = std::result::Result<T, CodePulseError>;

#[cfg(test)]
mod tests {
    use super::CodePulseError;
    use std::io;

    #[test]
    fn io_error_formats_message() {
        let error = CodePulseError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(format!("{error}"), "io error: boom");
    }

    #[test]
    fn other_error_formats_message() {
        let error = CodePulseError::Other("analysis failed".to_string());
        assert_eq!(format!("{error}"), "analysis failed");
    }

    #[test]
    fn pattern_error_names_pattern() {
        let error = CodePulseError::Pattern {
            pattern: "[".to_string(),
            message: "unclosed".to_string(),
        };
        assert_eq!(format!("{error}"), "invalid pattern `[`: unclosed");
    }

    #[test]
    fn from_io_error_maps_variant() {
        let error: CodePulseError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            CodePulseError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("expected Io variant"),
        }
    }
}
