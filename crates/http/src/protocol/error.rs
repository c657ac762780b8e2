use std::io;
use thiserror::Error;

use crate::protocol::StatusCode;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Failure while turning received bytes into a request.
///
/// Every variant is terminal for the connection it occurred on: the server
/// sends the matching error response once and closes the socket.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    #[error("request header exceeds the limit of {max_size} bytes")]
    EntityTooLarge { max_size: usize },

    #[error("unsupported protocol version: {version}")]
    UnsupportedVersion { version: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn bad_request<S: ToString>(reason: S) -> Self {
        Self::BadRequest { reason: reason.to_string() }
    }

    pub fn entity_too_large(max_size: usize) -> Self {
        Self::EntityTooLarge { max_size }
    }

    pub fn unsupported_version<S: ToString>(version: S) -> Self {
        Self::UnsupportedVersion { version: version.to_string() }
    }

    /// The status code reported to the client before the connection drops.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::EntityTooLarge { .. } => StatusCode::REQUEST_ENTITY_TOO_LARGE,
            Self::UnsupportedVersion { .. } => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
