//! Errors that can surface at the edges of a join: reading collections, parsing bracket notation
//! and loading or writing configuration and results.
//!
//! Contract violations inside the filter stage are not represented here, they panic.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Parse { line: usize, message: String },
    Config(String),
    Serialization(String),
}

impl Error {

    pub fn parse(line: usize, message: &str) -> Self {

        return Error::Parse { line, message: message.to_string() };
    }
}

impl fmt::Display for Error {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Parse { line, message } => write!(f, "malformed bracket notation on line {}: {}", line, message),
            Error::Config(message) => write!(f, "invalid configuration: {}", message),
            Error::Serialization(message) => write!(f, "serialization failed: {}", message),
        }
    }
}

impl std::error::Error for Error {

    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl std::convert::From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Error {
        Error::Serialization(e.to_string())
    }
}

impl std::convert::From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serialization(e.to_string())
    }
}
