use futures::Stream;
use futures::stream;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, VecDeque};

use crate::client::Discogs;
use crate::error::DiscogsError;
use crate::transport::{ReqwestTransport, Transport};

/// Pagination metadata from the most recently fetched page. All fields are
/// `None` until the first fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub total_items: Option<u64>,
    pub total_pages: Option<u64>,
}

/// Wire pagination envelope:
///
/// ```json
/// {
///   "pagination": {"page": 1, "pages": 5, "per_page": 50, "items": 230,
///                  "urls": {"next": "https://..."}},
///   "<items_key>": [...]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
struct PaginationEnvelope {
    page: Option<u64>,
    pages: Option<u64>,
    per_page: Option<u64>,
    items: Option<u64>,
    #[serde(default)]
    urls: PageUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PageUrls {
    next: Option<String>,
}

/// Auto-paginating, forward-only sequence over a listing endpoint. A single
/// instance is consumed once; call the originating facade again to restart.
///
/// The first page comes from `path` + `params`; subsequent pages follow the
/// server-provided absolute `next` URL verbatim (it may encode cursor state
/// the client must not reconstruct).
pub struct Page<M, T: Transport = ReqwestTransport> {
    client: Discogs<T>,
    path: String,
    params: BTreeMap<String, String>,
    items_key: &'static str,
    items_path: Option<Vec<&'static str>>,
    batch: VecDeque<M>,
    next_url: Option<String>,
    exhausted: bool,
    first_page_fetched: bool,
    info: PageInfo,
}

impl<M, T> Page<M, T>
where
    M: DeserializeOwned,
    T: Transport,
{
    pub fn new(
        client: Discogs<T>,
        path: impl Into<String>,
        items_key: &'static str,
        params: Option<BTreeMap<String, String>>,
    ) -> Self {
        let mut params = params.unwrap_or_default();
        params
            .entry("page".to_owned())
            .or_insert_with(|| "1".to_owned());
        Self {
            client,
            path: path.into(),
            params,
            items_key,
            items_path: None,
            batch: VecDeque::new(),
            next_url: None,
            exhausted: false,
            first_page_fetched: false,
            info: PageInfo::default(),
        }
    }

    /// For nested response shapes, descend through `keys` before expecting
    /// the items array. A missing or malformed location yields an empty
    /// batch rather than an error.
    pub fn with_items_path(mut self, keys: impl IntoIterator<Item = &'static str>) -> Self {
        self.items_path = Some(keys.into_iter().collect());
        self
    }

    #[inline]
    pub fn info(&self) -> PageInfo {
        self.info
    }

    /// Current page number, or `None` before the first fetch.
    #[inline]
    pub fn page(&self) -> Option<u64> {
        self.info.page
    }

    #[inline]
    pub fn per_page(&self) -> Option<u64> {
        self.info.per_page
    }

    #[inline]
    pub fn total_items(&self) -> Option<u64> {
        self.info.total_items
    }

    #[inline]
    pub fn total_pages(&self) -> Option<u64> {
        self.info.total_pages
    }

    async fn fetch_page(&mut self) -> Result<(), DiscogsError> {
        let resp = match self.next_url.take() {
            Some(next) => self.client.get(&next, None).await?,
            None => {
                self.client
                    .get(&self.path, Some(self.params.clone()))
                    .await?
            }
        };
        let body: serde_json::Value = resp.json()?;

        let pagination = body
            .get("pagination")
            .cloned()
            .and_then(|v| serde_json::from_value::<PaginationEnvelope>(v).ok())
            .unwrap_or_default();
        self.info = PageInfo {
            page: pagination.page,
            per_page: pagination.per_page,
            total_items: pagination.items,
            total_pages: pagination.pages,
        };
        self.next_url = pagination.urls.next;
        if self.next_url.is_none() {
            self.exhausted = true;
        }

        let raw_items = match &self.items_path {
            Some(keys) => {
                let mut node = Some(&body);
                for key in keys {
                    node = node.and_then(|n| n.get(key));
                }
                node.and_then(|n| n.as_array()).cloned().unwrap_or_default()
            }
            None => body
                .get(self.items_key)
                .and_then(|n| n.as_array())
                .cloned()
                .unwrap_or_default(),
        };

        self.batch.clear();
        for item in raw_items {
            let decoded =
                serde_json::from_value::<M>(item).map_err(|source| DiscogsError::Decode {
                    source,
                    body: crate::error::body_preview(&resp.headers, &resp.body),
                })?;
            self.batch.push_back(decoded);
        }
        self.first_page_fetched = true;
        Ok(())
    }

    /// Next item, fetching page boundaries as needed. `Ok(None)` once
    /// exhausted; an exhausted sequence never fetches again. A "next" page
    /// that comes back empty ends the sequence (the alternative is looping
    /// forever on a server that keeps advertising one).
    pub async fn try_next(&mut self) -> Result<Option<M>, DiscogsError> {
        if !self.first_page_fetched {
            self.fetch_page().await?;
        }
        if self.batch.is_empty() {
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
            if self.batch.is_empty() {
                self.exhausted = true;
                return Ok(None);
            }
        }
        Ok(self.batch.pop_front())
    }

    /// Drain the remainder of the sequence into a vector.
    pub async fn try_collect(mut self) -> Result<Vec<M>, DiscogsError> {
        let mut out = Vec::new();
        while let Some(item) = self.try_next().await? {
            out.push(item);
        }
        Ok(out)
    }

    /// `futures::Stream` adapter over the same pull semantics.
    pub fn into_stream(self) -> impl Stream<Item = Result<M, DiscogsError>>
    where
        M: Send,
    {
        stream::try_unfold(self, |mut page| async move {
            Ok(page.try_next().await?.map(|item| (item, page)))
        })
    }
}
