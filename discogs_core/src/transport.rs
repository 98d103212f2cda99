use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

/// A fully composed request, ready for the wire: headers are merged, the
/// query is already part of the URL, the body (if any) is encoded.
#[derive(Clone, Debug)]
pub struct BuiltRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Per-attempt timeout. Retries get a fresh budget.
    pub timeout: Option<Duration>,
}

/// Raw response as seen by the pipeline: body fully read and already
/// decompressed by the HTTP layer.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Other,
}

#[derive(Debug)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    #[inline]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Connect failures and per-attempt timeouts may be retried; anything
    /// else is terminal.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Connect | TransportErrorKind::Timeout
        )
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_timeout() {
            TransportErrorKind::Timeout
        } else {
            TransportErrorKind::Other
        };
        Self {
            kind,
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

/// Injectable transport layer.
///
/// Contract:
/// - Must honor `BuiltRequest` fields (url/headers/body/timeout) as appropriate.
/// - Must not leak a concrete HTTP client type in its public surface.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        req: BuiltRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send>>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    #[inline]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    #[inline]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        req: BuiltRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut rb = client.request(req.method, req.url).headers(req.headers);
            if let Some(b) = req.body {
                rb = rb.body(b);
            }
            if let Some(t) = req.timeout {
                rb = rb.timeout(t);
            }
            let resp = rb.send().await.map_err(TransportError::from)?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let body = resp.bytes().await.map_err(TransportError::from)?;
            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connect_and_timeout_errors_are_retryable() {
        assert!(TransportError::connect("refused").is_retryable());
        assert!(TransportError::timeout("deadline").is_retryable());
        assert!(!TransportError::new(TransportErrorKind::Other, "tls").is_retryable());
    }

    #[test]
    fn display_uses_the_message() {
        let e = TransportError::connect("connection refused");
        assert_eq!(e.to_string(), "connection refused");
        assert_eq!(e.kind(), TransportErrorKind::Connect);
    }
}
