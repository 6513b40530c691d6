use thiserror::Error;

use crate::transport::FailureKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport handle has been torn down")]
    Precondition,

    #[error("could not resolve host: {message} ({diagnostic})")]
    Connectivity { message: String, diagnostic: String },

    #[error("transport error {code}: {message}")]
    Transport {
        kind: FailureKind,
        code: u32,
        message: String,
    },

    #[error("transport returned an empty response")]
    EmptyResponse,

    #[error("failed to decode json body: {0}")]
    Decode(String),

    #[error("property is immutable: {0}")]
    ImmutableProperty(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Decode(value.to_string())
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
