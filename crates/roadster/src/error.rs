//! Error types for the driving demo.

use std::fmt;

/// Result type for roadster operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or loading the demo.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A launch parameter failed validation.
    InvalidParam {
        /// Name of the parameter.
        name: &'static str,
        /// Why the value was rejected.
        detail: String,
    },
    /// A model asset could not be loaded.
    ModelLoad {
        /// Asset path of the model.
        path: String,
        /// The loader's error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidParam { name, detail } => {
                write!(f, "invalid value for --{name}: {detail}")
            }
            Error::ModelLoad { path, message } => {
                write!(f, "failed to load model {path}: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_param() {
        let err = Error::InvalidParam {
            name: "spawn-height",
            detail: "must be finite".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for --spawn-height: must be finite");
    }

    #[test]
    fn test_display_model_load() {
        let err = Error::ModelLoad {
            path: "car.glb".to_string(),
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "failed to load model car.glb: not found");
    }
}
