/// TMDB API response types for deserialization.
///
/// These structures mirror the JSON response format of the TMDB v3 API.
use serde::Deserialize;
use std::collections::HashMap;

/// Response from the search, recommendations and similar endpoints, which
/// all share the same paged-results shape.
#[derive(Debug, Deserialize)]
pub(super) struct PagedResults {
    /// Result entries; may be absent on malformed responses
    #[serde(default)]
    pub results: Vec<TitleEntry>,
}

/// One entry of a search/recommendations result list.
///
/// Movies carry `title`/`release_date`, series carry `name`/
/// `first_air_date`. Multi search additionally tags entries with
/// `media_type` (which can also be "person").
#[derive(Debug, Deserialize)]
pub(super) struct TitleEntry {
    #[serde(default)]
    pub id: u64,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
}

/// Response from the watch/providers endpoint: one bucket set per region
/// code.
#[derive(Debug, Deserialize)]
pub(super) struct WatchProvidersResponse {
    #[serde(default)]
    pub results: HashMap<String, RegionBuckets>,
}

/// The per-region offer buckets of a watch/providers response.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RegionBuckets {
    #[serde(default)]
    pub flatrate: Vec<ProviderEntry>,
    #[serde(default)]
    pub rent: Vec<ProviderEntry>,
    #[serde(default)]
    pub buy: Vec<ProviderEntry>,
    #[serde(default)]
    pub free: Vec<ProviderEntry>,
    #[serde(default)]
    pub ads: Vec<ProviderEntry>,
}

/// A single provider reference inside an offer bucket.
#[derive(Debug, Deserialize)]
pub(super) struct ProviderEntry {
    pub provider_name: Option<String>,
}
