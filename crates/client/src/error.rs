use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Recognized by the grammar but not mapped by the dispatcher.
    #[error("unsupported command: {0}")]
    Unsupported(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered but the body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// Missing or malformed public key material.
    #[error("key error: {0}")]
    Key(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
