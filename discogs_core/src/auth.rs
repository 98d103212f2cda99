use core::fmt;
use http::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use http::{HeaderMap, HeaderValue};
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DiscogsError;

/// Minimal secret wrapper that never reveals its contents in Debug/Display.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    #[inline]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Explicit escape hatch used when the value has to go on the wire.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}
impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl<T: Into<String>> From<T> for Secret {
    #[inline]
    fn from(v: T) -> Self {
        Self::new(v)
    }
}

/// Authentication material, resolved once at client construction and
/// immutable afterwards.
///
/// Precedence when several modes are configured: plain token > full OAuth >
/// consumer key/secret alone > unauthenticated.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    token: Option<Secret>,
    consumer_key: Option<String>,
    consumer_secret: Option<Secret>,
    access_token: Option<String>,
    access_token_secret: Option<Secret>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the `DISCOGS_*` environment variables. Empty values count as
    /// absent. Intended to be called once by the outermost constructor, not
    /// from the request path.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            env::var(name).ok().filter(|v| !v.is_empty())
        }
        Self {
            token: var("DISCOGS_TOKEN").map(Secret::new),
            consumer_key: var("DISCOGS_CONSUMER_KEY"),
            consumer_secret: var("DISCOGS_CONSUMER_SECRET").map(Secret::new),
            access_token: var("DISCOGS_ACCESS_TOKEN"),
            access_token_secret: var("DISCOGS_ACCESS_TOKEN_SECRET").map(Secret::new),
        }
    }

    pub fn token(mut self, token: impl Into<Secret>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn consumer_key(mut self, key: impl Into<String>) -> Self {
        self.consumer_key = Some(key.into());
        self
    }

    pub fn consumer_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.consumer_secret = Some(secret.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn access_token_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.access_token_secret = Some(secret.into());
        self
    }

    /// Field-by-field merge: values already set win, `fallback` fills the
    /// gaps. This is how explicit arguments take precedence over the
    /// environment.
    pub fn or(self, fallback: Credentials) -> Self {
        Self {
            token: self.token.or(fallback.token),
            consumer_key: self.consumer_key.or(fallback.consumer_key),
            consumer_secret: self.consumer_secret.or(fallback.consumer_secret),
            access_token: self.access_token.or(fallback.access_token),
            access_token_secret: self.access_token_secret.or(fallback.access_token_secret),
        }
    }

    #[inline]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    #[inline]
    pub fn has_consumer_key(&self) -> bool {
        self.consumer_key.is_some()
    }

    /// All four OAuth-mode values are present.
    pub fn is_full_oauth(&self) -> bool {
        self.consumer_key.is_some()
            && self.consumer_secret.is_some()
            && self.access_token.is_some()
            && self.access_token_secret.is_some()
    }

    /// Headers that do not depend on per-request state: User-Agent and
    /// Accept always; a static authorization form when a plain token, or a
    /// consumer pair without an access token, is configured. OAuth
    /// signatures need a fresh timestamp/nonce and are built per request by
    /// [`Credentials::oauth_header`] instead.
    pub fn static_headers(&self, user_agent: &str) -> Result<HeaderMap, DiscogsError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            headers.insert(
                AUTHORIZATION,
                header_value(&format!("Discogs token={}", token.expose()))?,
            );
        } else if let (Some(key), Some(secret), None) = (
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
        ) {
            headers.insert(
                AUTHORIZATION,
                header_value(&format!("Discogs key={}, secret={}", key, secret.expose()))?,
            );
        }
        Ok(headers)
    }

    /// One-time OAuth 1.0a PLAINTEXT authorization header for the configured
    /// user credentials. Fails without network I/O when either credential
    /// pair is missing.
    pub fn oauth_header(&self) -> Result<String, DiscogsError> {
        let (Some(consumer_key), Some(consumer_secret)) =
            (&self.consumer_key, &self.consumer_secret)
        else {
            return Err(DiscogsError::Configuration(
                "OAuth requires consumer_key and consumer_secret",
            ));
        };
        let (Some(access_token), Some(access_token_secret)) =
            (&self.access_token, &self.access_token_secret)
        else {
            return Err(DiscogsError::Configuration(
                "OAuth requires access_token and access_token_secret",
            ));
        };
        Ok(build_oauth_header(&OauthRequest {
            consumer_key,
            consumer_secret: consumer_secret.expose(),
            token: Some(access_token),
            token_secret: access_token_secret.expose(),
            verifier: None,
            callback: None,
        }))
    }
}

fn header_value(v: &str) -> Result<HeaderValue, DiscogsError> {
    HeaderValue::from_str(v)
        .map_err(|_| DiscogsError::Configuration("credential is not a valid header value"))
}

/// Parameters for one OAuth 1.0a PLAINTEXT header. The token-less form is
/// what the request-token leg of the flow uses.
#[derive(Clone, Copy, Debug, Default)]
pub struct OauthRequest<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: &'a str,
    pub verifier: Option<&'a str>,
    pub callback: Option<&'a str>,
}

/// Build an OAuth 1.0a Authorization header using PLAINTEXT signatures: the
/// signature is literally `consumer_secret&token_secret`, sent over TLS
/// rather than cryptographically derived.
pub fn build_oauth_header(req: &OauthRequest<'_>) -> String {
    let mut params: Vec<(&str, String)> = vec![
        ("oauth_consumer_key", req.consumer_key.to_owned()),
        ("oauth_nonce", nonce()),
        (
            "oauth_signature",
            format!("{}&{}", req.consumer_secret, req.token_secret),
        ),
        ("oauth_signature_method", "PLAINTEXT".to_owned()),
        ("oauth_timestamp", unix_timestamp().to_string()),
    ];
    if let Some(token) = req.token {
        params.push(("oauth_token", token.to_owned()));
    }
    if let Some(verifier) = req.verifier {
        params.push(("oauth_verifier", verifier.to_owned()));
    }
    if let Some(callback) = req.callback {
        params.push(("oauth_callback", callback.to_owned()));
    }
    let parts: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, urlencoding::encode(v)))
        .collect();
    format!("OAuth {}", parts.join(", "))
}

fn nonce() -> String {
    let bytes: [u8; 16] = rand::random();
    let mut out = String::with_capacity(32);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
