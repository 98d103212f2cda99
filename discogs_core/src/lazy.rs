use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use crate::client::Discogs;
use crate::error::DiscogsError;
use crate::transport::{ReqwestTransport, Transport};

type SubResourceCtor = Box<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Deferred handle for a single remote resource. Construction performs no
/// I/O; the payload is fetched at most once per handle, the first time
/// [`get`](LazyResource::get) is called.
///
/// Resolution is explicit: callers force it with `get().await` and read back
/// an already-resolved payload with [`try_resolved`](LazyResource::try_resolved).
/// Named sub-resources never trigger a fetch, resolved or not.
pub struct LazyResource<M, T: Transport = ReqwestTransport> {
    client: Discogs<T>,
    path: String,
    resolved: OnceCell<M>,
    ctors: HashMap<&'static str, SubResourceCtor>,
    children: Mutex<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
}

impl<M, T> LazyResource<M, T>
where
    M: DeserializeOwned,
    T: Transport,
{
    pub fn new(client: Discogs<T>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            resolved: OnceCell::new(),
            ctors: HashMap::new(),
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Register a named sub-resource constructor. The constructor must not
    /// perform I/O; it is invoked lazily, once per name.
    pub fn with_sub_resource(
        mut self,
        name: &'static str,
        ctor: impl Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync + 'static,
    ) -> Self {
        self.ctors.insert(name, Box::new(ctor));
        self
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Force resolution and borrow the payload. Issues at most one
    /// successful fetch per handle, even under concurrent callers; a failed
    /// attempt is not memoized, so a later call may retry.
    pub async fn get(&self) -> Result<&M, DiscogsError> {
        self.resolved
            .get_or_try_init(|| async {
                let resp = self.client.get(&self.path, None).await?;
                resp.json::<M>()
            })
            .await
    }

    /// The payload, if a prior [`get`](LazyResource::get) succeeded. Never
    /// performs I/O.
    #[inline]
    pub fn try_resolved(&self) -> Option<&M> {
        self.resolved.get()
    }

    /// Identity-stable named child, built on first access with zero I/O.
    /// `None` for names that were never registered.
    pub fn sub_resource(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let (key, ctor) = self.ctors.get_key_value(name)?;
        let mut children = self
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = children.get(*key) {
            return Some(Arc::clone(existing));
        }
        let child = ctor();
        children.insert(*key, Arc::clone(&child));
        Some(child)
    }

    /// Typed convenience over [`sub_resource`](LazyResource::sub_resource).
    pub fn sub_resource_as<S: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<S>> {
        self.sub_resource(name)?.downcast::<S>().ok()
    }
}

impl<M, T: Transport> fmt::Debug for LazyResource<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResource")
            .field("path", &self.path)
            .field("resolved", &self.resolved.initialized())
            .finish_non_exhaustive()
    }
}
