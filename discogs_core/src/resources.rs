//! Thin per-endpoint facades. Each one only builds a path and hands it to a
//! [`LazyResource`] or [`Page`]; the full endpoint surface is out of scope
//! and new facades follow the same three-line pattern.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::client::Discogs;
use crate::lazy::LazyResource;
use crate::models::{Artist, ArtistRelease, CommunityRating, Release, SearchResult};
use crate::page::Page;
use crate::transport::Transport;

pub struct Releases<T: Transport> {
    client: Discogs<T>,
}

impl<T: Transport> Releases<T> {
    /// Lazy handle for a release. The `"rating"` sub-resource resolves
    /// `/releases/{id}/rating` independently.
    pub fn get(&self, release_id: u64) -> LazyResource<Release, T> {
        let client = self.client.clone();
        LazyResource::new(self.client.clone(), format!("/releases/{release_id}"))
            .with_sub_resource("rating", move || {
                Arc::new(LazyResource::<CommunityRating, T>::new(
                    client.clone(),
                    format!("/releases/{release_id}/rating"),
                )) as Arc<dyn Any + Send + Sync>
            })
    }
}

pub struct Artists<T: Transport> {
    client: Discogs<T>,
}

impl<T: Transport> Artists<T> {
    pub fn get(&self, artist_id: u64) -> LazyResource<Artist, T> {
        LazyResource::new(self.client.clone(), format!("/artists/{artist_id}"))
    }

    /// An artist's releases, newest API ordering, auto-paginated.
    pub fn releases(&self, artist_id: u64) -> Page<ArtistRelease, T> {
        Page::new(
            self.client.clone(),
            format!("/artists/{artist_id}/releases"),
            "releases",
            None,
        )
    }
}

impl<T: Transport> Discogs<T> {
    pub fn releases(&self) -> Releases<T> {
        Releases {
            client: self.clone(),
        }
    }

    pub fn artists(&self) -> Artists<T> {
        Artists {
            client: self.clone(),
        }
    }

    /// Database search. Accepts any Discogs search parameter
    /// (`q`, `type`, `artist`, `label`, ...); returns an auto-paginating
    /// sequence of results.
    pub fn search(&self, params: BTreeMap<String, String>) -> Page<SearchResult, T> {
        Page::new(self.clone(), "/database/search", "results", Some(params))
    }
}
