use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::error::DiscogsError;

/// A cached response: status, replayable headers, fully decoded body bytes.
/// Framing headers (content-encoding and friends) are stripped by the client
/// before storage, because the stored body is already decoded.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Pluggable response cache.
///
/// Contract:
/// - `get` returns a fresh entry, or `None` on miss/expiry; expired rows are
///   dropped on read.
/// - Entries are written wholesale and never partially updated.
/// - Implementations lock internally; the client calls them from concurrent
///   tasks.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: &str, entry: CacheEntry);
    fn clear(&self);
    fn close(&self);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory cache keyed on a monotonic clock, so TTL math is immune to
/// wall-clock adjustments. Process-local, lost on restart.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, CacheEntry)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = lock(&self.entries);
        let expired = match entries.get(key) {
            Some((expires_at, entry)) if Instant::now() < *expires_at => {
                return Some(entry.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        lock(&self.entries).insert(key.to_owned(), (Instant::now() + self.ttl, entry));
    }

    fn clear(&self) {
        lock(&self.entries).clear();
    }

    fn close(&self) {}
}

/// SQLite-backed cache using wall-clock expiry, so entries survive process
/// restarts.
pub struct SqliteCache {
    ttl: Duration,
    conn: Mutex<Option<Connection>>,
}

impl SqliteCache {
    /// Opens (creating if necessary) `cache.db` under `dir`.
    pub fn open(ttl: Duration, dir: impl AsRef<Path>) -> Result<Self, DiscogsError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| DiscogsError::Cache(e.to_string()))?;
        let conn = Connection::open(dir.join("cache.db"))
            .map_err(|e| DiscogsError::Cache(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_entries (
               key TEXT PRIMARY KEY,
               expires_at REAL NOT NULL,
               status INTEGER NOT NULL,
               headers TEXT NOT NULL,
               body BLOB NOT NULL
             )",
        )
        .map_err(|e| DiscogsError::Cache(e.to_string()))?;
        Ok(Self {
            ttl,
            conn: Mutex::new(Some(conn)),
        })
    }
}

fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn headers_to_json(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();
    serde_json::to_string(&pairs).ok()
}

fn headers_from_json(raw: &str) -> Option<HeaderMap> {
    let pairs: Vec<(String, String)> = serde_json::from_str(raw).ok()?;
    let mut headers = HeaderMap::new();
    for (k, v) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(k.as_bytes()),
            HeaderValue::from_str(&v),
        ) {
            headers.append(name, value);
        }
    }
    Some(headers)
}

impl ResponseCache for SqliteCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let guard = lock(&self.conn);
        let conn = guard.as_ref()?;
        let row = conn
            .query_row(
                "SELECT expires_at, status, headers, body FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                },
            )
            .optional();
        let (expires_at, status, headers_json, body) = match row {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        if wall_clock_secs() >= expires_at {
            if let Err(e) = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key]) {
                warn!(error = %e, "failed to purge expired cache entry");
            }
            return None;
        }
        Some(CacheEntry {
            status: StatusCode::from_u16(status).ok()?,
            headers: headers_from_json(&headers_json)?,
            body: Bytes::from(body),
        })
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        let guard = lock(&self.conn);
        let Some(conn) = guard.as_ref() else {
            return;
        };
        let Some(headers_json) = headers_to_json(&entry.headers) else {
            return;
        };
        if let Err(e) = conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, expires_at, status, headers, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                wall_clock_secs() + self.ttl.as_secs_f64(),
                entry.status.as_u16(),
                headers_json,
                entry.body.as_ref(),
            ],
        ) {
            warn!(error = %e, "cache write failed");
        }
    }

    fn clear(&self) {
        let guard = lock(&self.conn);
        if let Some(conn) = guard.as_ref() {
            if let Err(e) = conn.execute("DELETE FROM cache_entries", []) {
                warn!(error = %e, "cache clear failed");
            }
        }
    }

    fn close(&self) {
        lock(&self.conn).take();
    }
}
