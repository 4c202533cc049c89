//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::routing::MAX_BODY_BYTES;

/// Bodies longer than this many bytes are truncated in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The JSON key that holds receipt file content.
const REDACTED_JSON_KEY: &str = "base64Content";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged in full at the `debug` level.
/// Receipt file content is never logged: JSON `base64Content` values are redacted, and
/// multipart and binary bodies are summarized by their size.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return (StatusCode::BAD_REQUEST, "Could not read request body").into_response();
        }
    };

    log_request(&parts, &loggable_body_text(&parts.headers, &body_bytes));

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    log_response(&parts, &loggable_body_text(&parts.headers, &body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

/// The text to log for a body with the given headers.
fn loggable_body_text(headers: &HeaderMap, body: &Bytes) -> String {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
        format!("<multipart body, {} bytes>", body.len())
    } else if content_type.starts_with("application/json") {
        redact_json_files(body)
    } else if content_type.starts_with("text/") || content_type.is_empty() {
        String::from_utf8_lossy(body).to_string()
    } else {
        format!("<{content_type} body, {} bytes>", body.len())
    }
}

/// Replace receipt file content in a JSON body with its length.
fn redact_json_files(body: &Bytes) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => String::from_utf8_lossy(body).to_string(),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if key == REDACTED_JSON_KEY
                    && let Value::String(content) = field
                {
                    *field = Value::String(format!("<redacted, {} chars>", content.len()));
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

/// Cut `body` to at most [LOG_BODY_LENGTH_LIMIT] bytes without splitting a character.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());

    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Received request: {headers:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Sending response: {headers:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}
