mod auth;
mod cache;
mod client;
pub mod error;
mod lazy;
mod models;
mod page;
mod request;
mod resources;
mod retry;
pub mod transport;

pub mod prelude {
    pub use crate::auth::{Credentials, OauthRequest, Secret, build_oauth_header};
    pub use crate::cache::{CacheEntry, MemoryCache, ResponseCache, SqliteCache};
    pub use crate::client::{
        DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT, Discogs, DiscogsBuilder,
        NoCacheGuard, USER_AGENT,
    };
    pub use crate::error::{DiscogsError, ErrorBody};
    pub use crate::lazy::LazyResource;
    pub use crate::models::{
        Artist, ArtistCredit, ArtistRelease, CommunityRating, RatingInfo, Release, SearchResult,
    };
    pub use crate::page::{Page, PageInfo};
    pub use crate::request::{ApiResponse, FileUpload, RequestOptions};
    pub use crate::resources::{Artists, Releases};
    pub use crate::retry::{RETRY_STATUSES, RetryPolicy};
    pub use crate::transport::{ReqwestTransport, Transport};
}
