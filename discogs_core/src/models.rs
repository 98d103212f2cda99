//! Typed payloads decoded by the shipped facades. The full Discogs model
//! surface is deliberately not enumerated here.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Release {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub master_id: Option<u64>,
    #[serde(default)]
    pub resource_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtistCredit {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// `/releases/{id}/rating` payload.
#[derive(Clone, Debug, Deserialize)]
pub struct CommunityRating {
    pub release_id: u64,
    pub rating: RatingInfo,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RatingInfo {
    pub average: f64,
    pub count: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Artist {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default, rename = "namevariations")]
    pub name_variations: Vec<String>,
    #[serde(default)]
    pub releases_url: Option<String>,
    #[serde(default)]
    pub resource_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtistRelease {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub main_release: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "catno")]
    pub catalog_number: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub resource_url: Option<String>,
}
