use axum::http::StatusCode;
use thiserror::Error;

use crate::signature::ClassificationError;

/// An error carrying the HTTP status it should be answered with.
///
/// Implement this for domain errors returned from handlers, extractors or
/// responders; the error responder writes `response_code()` and the error's
/// `Display` text as `{"error": "<message>"}`.
pub trait HttpError: std::fmt::Display {
    fn response_code(&self) -> StatusCode;
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("decoding json: {0}")]
    DecodeJson(#[source] serde_json::Error),

    #[error("encoding json: {0}")]
    EncodeJson(#[source] serde_json::Error),

    #[error("reading request body: {0}")]
    ReadBody(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("missing required query parameter: {0}")]
    MissingParam(&'static str),

    #[error("bad value for query parameter {name}: {reason}")]
    BadParam { name: &'static str, reason: String },

    #[error("{message}")]
    Http { code: StatusCode, message: String },

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("error while routing {path}: {source}")]
    Route {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{method} handler: {source}")]
    Method {
        method: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("adaptor for {0} was handed a value of a different type")]
    AdaptorMismatch(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn http(code: StatusCode, message: impl Into<String>) -> Self {
        Error::Http {
            code,
            message: message.into(),
        }
    }

    /// The status the error responder answers with, or `None` for internal
    /// errors (logged, answered with 500).
    pub fn response_code(&self) -> Option<StatusCode> {
        match self {
            Error::DecodeJson(_)
            | Error::ReadBody(_)
            | Error::MissingParam(_)
            | Error::BadParam { .. } => Some(StatusCode::BAD_REQUEST),
            Error::BodyTooLarge { .. } => Some(StatusCode::PAYLOAD_TOO_LARGE),
            Error::Http { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl<E: HttpError> From<E> for Error {
    fn from(err: E) -> Self {
        Error::Http {
            code: err.response_code(),
            message: err.to_string(),
        }
    }
}
