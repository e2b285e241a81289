use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotevoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("`{program}` is not installed or not reachable: {reason}")]
    MissingExecutable { program: String, reason: String },

    #[error("Invalid {field} `{value}` at line {line} of {}", .path.display())]
    InvalidNumber {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid parameter: {name} = {value}, {message}")]
    InvalidParameter {
        name: String,
        value: String,
        message: String,
    },

    #[error("Plotting error: {0}")]
    Plot(String),
}

/// Type alias for Result with MotevoError
pub type Result<T> = std::result::Result<T, MotevoError>;

impl MotevoError {
    /// Create a new MissingExecutable error
    pub fn missing_executable(program: impl Into<String>, reason: impl Into<String>) -> Self {
        MotevoError::MissingExecutable {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidParameter error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        MotevoError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}
