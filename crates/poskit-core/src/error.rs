use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("Invalid display configuration: {0}")]
    InvalidDisplayConfig(String),

    #[error("Invalid line index {index} for a {lines}-line display")]
    InvalidLineIndex { index: usize, lines: usize },

    // Payload errors
    #[error("Too many lines: {given} given, display has {lines}")]
    TooManyLines { given: usize, lines: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
