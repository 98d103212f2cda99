use http::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Method};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::auth::Credentials;
use crate::cache::{CacheEntry, MemoryCache, ResponseCache, SqliteCache};
use crate::error::DiscogsError;
use crate::request::{ApiResponse, RequestOptions, multipart_boundary};
use crate::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};
use crate::transport::{BuiltRequest, ReqwestTransport, Transport, TransportResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.discogs.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default descriptive client identifier, RFC 1945 product-token style.
pub const USER_AGENT: &str = concat!("discogs_core/", env!("CARGO_PKG_VERSION"));

struct Inner<T: Transport> {
    transport: T,
    credentials: Credentials,
    base_url: String,
    user_agent: String,
    static_headers: HeaderMap,
    retry: RetryPolicy,
    timeout: Duration,
    cache: Option<Box<dyn ResponseCache>>,
    cache_enabled: AtomicBool,
}

/// Client for the Discogs API. Cheap to clone; clones share the transport,
/// credentials and cache.
///
/// ```no_run
/// # async fn demo() -> Result<(), discogs_core::error::DiscogsError> {
/// use discogs_core::prelude::*;
///
/// let client = Discogs::builder().token("my-token").build()?;
/// let release = client.releases().get(352_665);
/// println!("{}", release.get().await?.title); // The Downward Spiral
/// # Ok(())
/// # }
/// ```
pub struct Discogs<T: Transport = ReqwestTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Discogs<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum CacheChoice {
    Off,
    Memory,
    Sqlite(PathBuf),
    Custom(Box<dyn ResponseCache>),
}

pub struct DiscogsBuilder {
    credentials: Credentials,
    env_fallback: bool,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    cache: CacheChoice,
    cache_ttl: Duration,
    user_agent: Option<String>,
    http_client: Option<reqwest::Client>,
}

impl Default for DiscogsBuilder {
    fn default() -> Self {
        Self {
            credentials: Credentials::new(),
            env_fallback: true,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            cache: CacheChoice::Off,
            cache_ttl: DEFAULT_CACHE_TTL,
            user_agent: None,
            http_client: None,
        }
    }
}

impl DiscogsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: impl Into<crate::auth::Secret>) -> Self {
        self.credentials = self.credentials.token(token);
        self
    }

    pub fn consumer_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = self.credentials.consumer_key(key);
        self
    }

    pub fn consumer_secret(mut self, secret: impl Into<crate::auth::Secret>) -> Self {
        self.credentials = self.credentials.consumer_secret(secret);
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = self.credentials.access_token(token);
        self
    }

    pub fn access_token_secret(mut self, secret: impl Into<crate::auth::Secret>) -> Self {
        self.credentials = self.credentials.access_token_secret(secret);
        self
    }

    /// Replace the credential set wholesale.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Whether missing credential fields fall back to the `DISCOGS_*`
    /// environment variables at build time. On by default; explicit values
    /// always win.
    pub fn env_fallback(mut self, enabled: bool) -> Self {
        self.env_fallback = enabled;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-attempt timeout; retries get a fresh budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries on 429/5xx/connection errors. `n` retries means `n + 1`
    /// total attempts; zero disables retrying entirely.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Enable the in-memory response cache.
    pub fn memory_cache(mut self) -> Self {
        self.cache = CacheChoice::Memory;
        self
    }

    /// Enable the on-disk response cache under `dir` (survives restarts).
    pub fn sqlite_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = CacheChoice::Sqlite(dir.into());
        self
    }

    /// Use a caller-supplied cache backend. The TTL, if any, is the
    /// backend's own business.
    pub fn custom_cache(mut self, cache: Box<dyn ResponseCache>) -> Self {
        self.cache = CacheChoice::Custom(cache);
        self
    }

    /// TTL for the built-in cache backends (default one hour).
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Custom User-Agent, replacing the default entirely.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Use a pre-configured `reqwest::Client`. The handle is shared, so
    /// teardown of this client never affects the caller's.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(mut self) -> Result<Discogs, DiscogsError> {
        let client = self.http_client.take().unwrap_or_else(reqwest::Client::new);
        self.build_with_transport(ReqwestTransport::new(client))
    }

    /// Build against an arbitrary transport implementation (tests inject a
    /// scripted mock here).
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Discogs<T>, DiscogsError> {
        let mut credentials = self.credentials;
        if self.env_fallback {
            credentials = credentials.or(Credentials::from_env());
        }
        if credentials.has_token() {
            debug!("auth: personal access token");
        } else if credentials.is_full_oauth() {
            debug!("auth: OAuth 1.0a");
        } else if credentials.has_consumer_key() {
            debug!("auth: consumer key/secret");
        } else {
            debug!("auth: none (unauthenticated)");
        }

        let user_agent = self.user_agent.unwrap_or_else(|| USER_AGENT.to_owned());
        let static_headers = credentials.static_headers(&user_agent)?;
        let base_url = self.base_url.trim_end_matches('/').to_owned();
        // Reject an unparsable base URL at build time rather than on first use.
        Url::parse(&base_url)?;

        let cache: Option<Box<dyn ResponseCache>> = match self.cache {
            CacheChoice::Off => None,
            CacheChoice::Memory => Some(Box::new(MemoryCache::new(self.cache_ttl))),
            CacheChoice::Sqlite(dir) => Some(Box::new(SqliteCache::open(self.cache_ttl, dir)?)),
            CacheChoice::Custom(cache) => Some(cache),
        };

        Ok(Discogs {
            inner: Arc::new(Inner {
                transport,
                credentials,
                base_url,
                user_agent,
                static_headers,
                retry: RetryPolicy::new(self.max_retries),
                timeout: self.timeout,
                cache,
                cache_enabled: AtomicBool::new(true),
            }),
        })
    }
}

impl Discogs<ReqwestTransport> {
    pub fn builder() -> DiscogsBuilder {
        DiscogsBuilder::new()
    }

    pub fn new(credentials: Credentials) -> Result<Self, DiscogsError> {
        Self::builder().credentials(credentials).build()
    }
}

impl<T: Transport> Discogs<T> {
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[inline]
    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Absolute URL for `path` with `params` merged in sorted key order
    /// (deterministic, so cache keys are stable). Absolute URLs, such as
    /// the server-provided pagination links, pass through untouched.
    pub fn build_url(
        &self,
        path: &str,
        params: Option<&BTreeMap<String, String>>,
    ) -> Result<Url, DiscogsError> {
        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)?
        } else {
            Url::parse(&format!(
                "{}/{}",
                self.inner.base_url,
                path.trim_start_matches('/')
            ))?
        };
        if let Some(params) = params {
            let mut qp = url.query_pairs_mut();
            for (k, v) in params {
                qp.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Convenience wrapper for the common GET case.
    pub async fn get(
        &self,
        path: &str,
        params: Option<BTreeMap<String, String>>,
    ) -> Result<ApiResponse, DiscogsError> {
        let mut opts = RequestOptions::new();
        opts.params = params;
        self.send(Method::GET, path, opts).await
    }

    /// Execute one logical request: compose headers, consult the cache,
    /// run the attempt loop, classify the terminal outcome.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        opts: RequestOptions,
    ) -> Result<ApiResponse, DiscogsError> {
        let url = self.build_url(path, opts.params.as_ref())?;

        let mut headers = self.inner.static_headers.clone();
        // Fresh nonce/timestamp per request; a plain token outranks OAuth.
        if !self.inner.credentials.has_token() && self.inner.credentials.is_full_oauth() {
            let header = self.inner.credentials.oauth_header()?;
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&header).map_err(|_| {
                    DiscogsError::Configuration("OAuth credentials are not a valid header value")
                })?,
            );
        }

        let mut body = None;
        if let Some(json) = &opts.json {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            body = Some(bytes::Bytes::from(json.to_string()));
        } else if let Some(file) = &opts.file {
            let boundary = multipart_boundary();
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))
                    .map_err(|_| DiscogsError::Configuration("invalid multipart boundary"))?,
            );
            body = Some(file.encode(&boundary));
        }

        let cacheable = method == Method::GET || method == Method::HEAD;
        let use_cache = cacheable
            && self.inner.cache.is_some()
            && self.inner.cache_enabled.load(Ordering::SeqCst);
        let cache_key = format!("{}:{}", method, url);
        if use_cache {
            if let Some(entry) = self.inner.cache.as_ref().and_then(|c| c.get(&cache_key)) {
                debug!(%method, %url, "cache hit");
                return Ok(ApiResponse {
                    status: entry.status,
                    headers: entry.headers,
                    body: entry.body,
                });
            }
        }

        let mut attempt: u32 = 0;
        loop {
            debug!(%method, %url, attempt, "http request");
            // Monotonic start point; elapsed math is immune to wall-clock
            // adjustments.
            let started = Instant::now();
            let built = BuiltRequest {
                method: method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: body.clone(),
                timeout: Some(self.inner.timeout),
            };
            let final_attempt = attempt >= self.inner.retry.max_retries();

            match self.inner.transport.send(built).await {
                Err(err) if err.is_retryable() && !final_attempt => {
                    let delay = self.inner.retry.delay_for(attempt, None);
                    info!(
                        %method, %url,
                        attempt = attempt + 2,
                        total = self.inner.retry.max_attempts(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after connection error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(
                        %method, %url,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %err,
                        "connection error"
                    );
                    return Err(DiscogsError::Connection(err));
                }
                Ok(resp) => {
                    debug!(
                        %method, %url,
                        status = resp.status.as_u16(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "http response"
                    );
                    if !RetryPolicy::is_retryable_status(resp.status) || final_attempt {
                        if use_cache && resp.status.is_success() {
                            if let Some(cache) = self.inner.cache.as_ref() {
                                cache.set(
                                    &cache_key,
                                    CacheEntry {
                                        status: resp.status,
                                        headers: strip_framing_headers(&resp.headers),
                                        body: resp.body.clone(),
                                    },
                                );
                            }
                        }
                        return finish(resp);
                    }
                    let retry_after = resp
                        .headers
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    let delay = self.inner.retry.delay_for(attempt, retry_after.as_deref());
                    info!(
                        %method, %url,
                        status = resp.status.as_u16(),
                        attempt = attempt + 2,
                        total = self.inner.retry.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying after status"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Temporarily bypass the response cache. The previous state is restored
    /// when the guard drops, including during unwinding.
    pub fn no_cache(&self) -> NoCacheGuard<'_, T> {
        let was_enabled = self.inner.cache_enabled.swap(false, Ordering::SeqCst);
        NoCacheGuard {
            client: self,
            was_enabled,
        }
    }

    /// Purge all cached responses. No-op when caching is disabled.
    pub fn clear_cache(&self) {
        if let Some(cache) = self.inner.cache.as_ref() {
            cache.clear();
        }
    }

    /// Release cache resources. The HTTP connection pool is released when
    /// the last clone drops; a caller-supplied `reqwest::Client` is a shared
    /// handle and stays open. Safe to call more than once.
    pub fn close(&self) {
        if let Some(cache) = self.inner.cache.as_ref() {
            cache.close();
        }
    }
}

fn finish(resp: TransportResponse) -> Result<ApiResponse, DiscogsError> {
    if resp.status.as_u16() >= 400 {
        return Err(DiscogsError::from_status(
            resp.status,
            &resp.headers,
            &resp.body,
        ));
    }
    Ok(ApiResponse {
        status: resp.status,
        headers: resp.headers,
        body: resp.body,
    })
}

/// Headers describing the wire encoding must not be replayed from the cache:
/// the stored body is already decoded, and a consumer seeing
/// `Content-Encoding: gzip` again would try to decompress it twice.
fn strip_framing_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    out.remove(CONTENT_ENCODING);
    out.remove(CONTENT_LENGTH);
    out.remove(TRANSFER_ENCODING);
    out
}

pub struct NoCacheGuard<'a, T: Transport> {
    client: &'a Discogs<T>,
    was_enabled: bool,
}

impl<T: Transport> Drop for NoCacheGuard<'_, T> {
    fn drop(&mut self) {
        self.client
            .inner
            .cache_enabled
            .store(self.was_enabled, Ordering::SeqCst);
    }
}
