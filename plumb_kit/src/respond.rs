use axum::body::Body;
use axum::http::header::{HeaderName, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::error::{Error, Result};

const INTERNAL_ERROR_BODY: &[u8] = br#"{"error":"internal server error"}"#;

/// Accumulates the response a handler's results write.
///
/// The first status written wins; later status writes are ignored while header
/// writes keep applying. Writing body bytes without a status implies 200.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the status was applied.
    pub fn write_status(&mut self, status: StatusCode) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(status);
        true
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.write_status(StatusCode::OK);
        self.body.extend_from_slice(bytes);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Encodes `value` and appends it to the body. Nothing is written when
    /// encoding fails.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(Error::EncodeJson)?;
        self.ensure_json_content_type();
        self.write(&bytes);
        Ok(())
    }

    fn ensure_json_content_type(&mut self) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

/// Writes `err` as the response: errors with a status code answer with it and
/// their message, everything else is logged and answered with a fixed 500.
pub fn respond_error(res: &mut ResponseWriter, parts: &Parts, err: &Error) {
    match err.response_code() {
        Some(code) => {
            res.write_status(code);
            let body = serde_json::json!({ "error": err.to_string() });
            if res.write_json(&body).is_err() {
                res.write(INTERNAL_ERROR_BODY);
            }
        }
        None => {
            tracing::error!(
                method = %parts.method,
                path = parts.uri.path(),
                error = %err,
                "error handling request"
            );
            res.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            res.ensure_json_content_type();
            res.write(INTERNAL_ERROR_BODY);
        }
    }
}

pub fn error_response(parts: &Parts, err: &Error) -> Response {
    let mut res = ResponseWriter::new();
    respond_error(&mut res, parts, err);
    res.into_response()
}
