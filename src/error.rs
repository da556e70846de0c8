use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `SirError` and maps to other errors to
/// convert to a `SirError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SirError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// An input value is invalid. `field` names the configuration field
    /// (or command line option) that was rejected.
    ConfigurationError {
        field: &'static str,
        message: String,
    },
    ReportError(String),
    SamplingError(String),
}

impl SirError {
    pub fn configuration(field: &'static str, message: impl Into<String>) -> Self {
        SirError::ConfigurationError {
            field,
            message: message.into(),
        }
    }

    /// Returns the name of the offending field if this is a configuration error.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SirError::ConfigurationError { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<io::Error> for SirError {
    fn from(error: io::Error) -> Self {
        SirError::IoError(error)
    }
}

impl From<serde_json::Error> for SirError {
    fn from(error: serde_json::Error) -> Self {
        SirError::JsonError(error)
    }
}

impl From<csv::Error> for SirError {
    fn from(error: csv::Error) -> Self {
        SirError::CsvError(error)
    }
}

impl From<rand_distr::BinomialError> for SirError {
    fn from(error: rand_distr::BinomialError) -> Self {
        SirError::SamplingError(error.to_string())
    }
}

impl std::error::Error for SirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SirError::IoError(error) => Some(error),
            SirError::JsonError(error) => Some(error),
            SirError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for SirError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SirError::IoError(error) => write!(f, "I/O error: {error}"),
            SirError::JsonError(error) => write!(f, "JSON error: {error}"),
            SirError::CsvError(error) => write!(f, "CSV error: {error}"),
            SirError::ConfigurationError { field, message } => {
                write!(f, "Invalid configuration for `{field}`: {message}")
            }
            SirError::ReportError(message) => write!(f, "Report error: {message}"),
            SirError::SamplingError(message) => write!(f, "Sampling error: {message}"),
        }
    }
}
