use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD as B64;
use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::transport::TransportError;

/// Raw response payload attached to API errors: parsed JSON when the body
/// decodes as such, a text preview otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorBody {
    Json(serde_json::Value),
    Text(String),
}

impl ErrorBody {
    pub fn from_response(headers: &HeaderMap, body: &[u8]) -> Self {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(v) => ErrorBody::Json(v),
            Err(_) => ErrorBody::Text(body_preview(headers, body)),
        }
    }

    /// Best-effort human message: the conventional `message` field when the
    /// body is structured, the raw text otherwise.
    pub fn message(&self) -> String {
        match self {
            ErrorBody::Json(v) => v
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_owned)
                .unwrap_or_else(|| v.to_string()),
            ErrorBody::Text(s) => s.clone(),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DiscogsError {
    /// DNS/connect/timeout failure after exhausting configured retries.
    #[error("connection error: {0}")]
    Connection(#[source] TransportError),

    #[error("401: {message}")]
    Authentication { message: String, body: ErrorBody },

    #[error("403: {message}")]
    Forbidden { message: String, body: ErrorBody },

    #[error("404: {message}")]
    NotFound { message: String, body: ErrorBody },

    #[error("422: {message}")]
    Validation { message: String, body: ErrorBody },

    /// 429. `retry_after` is the server's suggested wait in seconds, when
    /// the header was present and numeric. Raised with the hint attached
    /// even when retries are disabled.
    #[error("429: {message}")]
    RateLimit {
        message: String,
        body: ErrorBody,
        retry_after: Option<f64>,
    },

    /// Any other non-2xx status.
    #[error("{status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        body: ErrorBody,
    },

    /// Raised synchronously when an operation requires credentials or
    /// options that are not configured. Never originates from network code.
    #[error("invalid configuration: {0}")]
    Configuration(&'static str),

    #[error("decode error: {source} (body: {body})")]
    Decode {
        source: serde_json::Error,
        body: String,
    },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("build url error: {0}")]
    BuildUrl(#[from] url::ParseError),
}

impl DiscogsError {
    /// Status code for HTTP-level failures, `None` for everything else.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DiscogsError::Authentication { .. } => Some(StatusCode::UNAUTHORIZED),
            DiscogsError::Forbidden { .. } => Some(StatusCode::FORBIDDEN),
            DiscogsError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            DiscogsError::Validation { .. } => Some(StatusCode::UNPROCESSABLE_ENTITY),
            DiscogsError::RateLimit { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            DiscogsError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a terminal non-2xx response by status code.
    pub(crate) fn from_status(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        let body = ErrorBody::from_response(headers, body);
        let message = body.message();
        match status.as_u16() {
            401 => DiscogsError::Authentication { message, body },
            403 => DiscogsError::Forbidden { message, body },
            404 => DiscogsError::NotFound { message, body },
            422 => DiscogsError::Validation { message, body },
            429 => DiscogsError::RateLimit {
                message,
                body,
                retry_after: parse_retry_after(headers),
            },
            _ => DiscogsError::Api {
                status,
                message,
                body,
            },
        }
    }
}

/// Numeric non-negative `Retry-After` value, if the header carries one.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(http::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| *v >= 0.0)
}

/// Render a response body for error messages and logs. Text-ish bodies are
/// truncated UTF-8; anything else becomes a base64 preview.
pub fn body_preview(headers: &HeaderMap, body: &[u8]) -> String {
    const MAX: usize = 8 * 1024;
    let ct = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let slice = if body.len() > MAX { &body[..MAX] } else { body };
    if ct.starts_with("application/json") || ct.starts_with("text/") || ct.is_empty() {
        match std::str::from_utf8(slice) {
            Ok(s) => {
                if body.len() > slice.len() {
                    format!("{}...", s)
                } else {
                    s.to_owned()
                }
            }
            Err(_) => format!("<non-utf8-text; {} bytes>", slice.len()),
        }
    } else {
        let b64 = B64.encode(slice);
        format!(
            "<non-text; {} bytes; base64:{}{}>",
            body.len(),
            &b64[..b64.len().min(1024)],
            if b64.len() > 1024 { "..." } else { "" }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        h
    }

    #[test]
    fn message_comes_from_the_message_field() {
        let e = DiscogsError::from_status(
            StatusCode::NOT_FOUND,
            &json_headers(),
            br#"{"message": "Release not found."}"#,
        );
        match e {
            DiscogsError::NotFound { message, body } => {
                assert_eq!(message, "Release not found.");
                assert!(matches!(body, ErrorBody::Json(_)));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn unstructured_body_is_used_verbatim() {
        let mut h = HeaderMap::new();
        h.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain"),
        );
        let e = DiscogsError::from_status(StatusCode::BAD_GATEWAY, &h, b"upstream blew up");
        match e {
            DiscogsError::Api {
                status, message, ..
            } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, "upstream blew up");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn classification_by_status() {
        let h = json_headers();
        let body = br#"{"message": "x"}"#;
        assert!(matches!(
            DiscogsError::from_status(StatusCode::UNAUTHORIZED, &h, body),
            DiscogsError::Authentication { .. }
        ));
        assert!(matches!(
            DiscogsError::from_status(StatusCode::FORBIDDEN, &h, body),
            DiscogsError::Forbidden { .. }
        ));
        assert!(matches!(
            DiscogsError::from_status(StatusCode::UNPROCESSABLE_ENTITY, &h, body),
            DiscogsError::Validation { .. }
        ));
        assert!(matches!(
            DiscogsError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &h, body),
            DiscogsError::Api { .. }
        ));
    }

    #[test]
    fn rate_limit_carries_numeric_hint() {
        let mut h = json_headers();
        h.insert(http::header::RETRY_AFTER, HeaderValue::from_static("10"));
        let e = DiscogsError::from_status(StatusCode::TOO_MANY_REQUESTS, &h, b"{}");
        match e {
            DiscogsError::RateLimit { retry_after, .. } => assert_eq!(retry_after, Some(10.0)),
            other => panic!("expected RateLimit, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_retry_after_yields_no_hint() {
        let mut h = json_headers();
        h.insert(
            http::header::RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&h), None);

        let mut h = json_headers();
        h.insert(http::header::RETRY_AFTER, HeaderValue::from_static("-3"));
        assert_eq!(parse_retry_after(&h), None);
    }

    #[test]
    fn binary_bodies_preview_as_base64() {
        let mut h = HeaderMap::new();
        h.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        let s = body_preview(&h, &[0x00, 0x01, 0x02]);
        assert!(s.contains("base64:AAEC"), "got: {s}");
    }
}
