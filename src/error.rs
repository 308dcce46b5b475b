//! Error types for the converter.

use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the converter.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing or unusable flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Preflight validation failures
    #[error("Preflight check failed: {0}")]
    Preflight(String),

    /// A definition file could not be parsed
    #[error("Unable to load {path}: {message}")]
    Definition { path: String, message: String },

    /// An input argument default could not be encoded
    #[error("Unable to encode argument {argument} of {technique}: {message}")]
    Argument {
        technique: String,
        argument: String,
        message: String,
    },

    /// Ledger consistency errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Knowledge base errors
    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    /// Output tree errors
    #[error("Output error: {path}: {message}")]
    Output { path: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] Box<serde_json::Error>),

    /// YAML errors
    #[error("YAML error: {0}")]
    Yaml(#[from] Box<serde_yaml::Error>),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] Box<csv::Error>),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a preflight error.
    pub fn preflight(message: impl Into<String>) -> Self {
        Self::Preflight(message.into())
    }

    /// Create a definition parse error.
    pub fn definition(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an argument encoding error.
    pub fn argument(
        technique: impl Into<String>,
        argument: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Argument {
            technique: technique.into(),
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create a ledger error.
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger(message.into())
    }

    /// Create a taxonomy error.
    pub fn taxonomy(message: impl Into<String>) -> Self {
        Self::Taxonomy(message.into())
    }

    /// Create an output error.
    pub fn output(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Output {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Box::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Box::new(value))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(Box::new(value))
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Self::Csv(Box::new(value))
    }
}

impl From<walkdir::Error> for Error {
    fn from(value: walkdir::Error) -> Self {
        Self::Io(Box::new(value.into()))
    }
}
