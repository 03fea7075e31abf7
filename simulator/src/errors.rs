use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConnectionError {
    #[error("malformed connection string segment: {0}")]
    Malformed(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("connection string has no HostName")]
    MissingHost,
}
