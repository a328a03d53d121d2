/// TMDB (The Movie Database) catalog implementation.
///
/// Talks to TMDB API v3 (https://developer.themoviedb.org/docs) using
/// bearer-token authentication.
use super::tmdb_types::{
    PagedResults, ProviderEntry, RegionBuckets, TitleEntry, WatchProvidersResponse,
};
use super::{MediaKind, ProviderLookupError, RegionListing, TitleCandidate, TitleCatalog};
use serde::de::DeserializeOwned;
use tracing::debug;

const BASE_URL: &str = "https://api.themoviedb.org/3";

/// Title catalog backed by the TMDB API.
pub struct TmdbCatalog {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

impl TmdbCatalog {
    /// Creates a new TMDB catalog using the given API read access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: BASE_URL.to_string(),
            token: token.into(),
        }
    }

    /// Performs an authenticated GET request and deserializes the JSON body.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderLookupError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "TMDB request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| ProviderLookupError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderLookupError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| ProviderLookupError::ParseError(e.to_string()))
    }

    /// Converts a result entry from the multi search endpoint.
    ///
    /// An entry is a movie when tagged as such or when it carries movie
    /// fields; everything else (including people) falls into the series
    /// branch, matching how the rest of the resolution treats it.
    fn candidate_from_multi(entry: TitleEntry) -> TitleCandidate {
        let is_movie = entry.media_type.as_deref() == Some("movie") || entry.title.is_some();
        let is_title = matches!(entry.media_type.as_deref(), Some("movie") | Some("tv"));
        let kind = if is_movie { MediaKind::Movie } else { MediaKind::Series };
        Self::candidate(entry, kind, is_title)
    }

    /// Converts a result entry from a kind-specific endpoint
    /// (recommendations/similar), which omits `media_type`.
    fn candidate_with_kind(entry: TitleEntry, kind: MediaKind) -> TitleCandidate {
        Self::candidate(entry, kind, true)
    }

    fn candidate(entry: TitleEntry, kind: MediaKind, is_title: bool) -> TitleCandidate {
        let title = match kind {
            MediaKind::Movie => entry.title.or(entry.original_title),
            MediaKind::Series => entry.name.or(entry.original_name),
        }
        .unwrap_or_else(|| "Unknown".to_string());

        let date = match kind {
            MediaKind::Movie => entry.release_date,
            MediaKind::Series => entry.first_air_date,
        };
        let year = date.as_deref().and_then(parse_year);

        TitleCandidate {
            id: entry.id,
            kind,
            is_title,
            title,
            year,
            poster_path: entry.poster_path,
        }
    }

    fn listing_from_buckets(buckets: RegionBuckets) -> RegionListing {
        let names = |entries: Vec<ProviderEntry>| -> Vec<String> {
            entries.into_iter().filter_map(|e| e.provider_name).collect()
        };
        RegionListing {
            flatrate: names(buckets.flatrate),
            rent: names(buckets.rent),
            buy: names(buckets.buy),
            free: names(buckets.free),
            ads: names(buckets.ads),
        }
    }
}

/// Extracts a four-digit year from the leading characters of a date string.
fn parse_year(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}

impl TitleCatalog for TmdbCatalog {
    fn search(&self, query: &str) -> Result<Vec<TitleCandidate>, ProviderLookupError> {
        let page: PagedResults = self.get_json(
            "/search/multi",
            &[("query", query), ("include_adult", "false")],
        )?;

        Ok(page
            .results
            .into_iter()
            .map(Self::candidate_from_multi)
            .collect())
    }

    fn region_listing(
        &self,
        kind: MediaKind,
        id: u64,
        region: &str,
    ) -> Result<RegionListing, ProviderLookupError> {
        let path = format!("/{}/{}/watch/providers", kind.path_segment(), id);
        let mut response: WatchProvidersResponse = self.get_json(&path, &[])?;

        // A region without data is "no offers", not an error.
        Ok(response
            .results
            .remove(region)
            .map(Self::listing_from_buckets)
            .unwrap_or_default())
    }

    fn recommendations(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> Result<Vec<TitleCandidate>, ProviderLookupError> {
        let path = format!("/{}/{}/recommendations", kind.path_segment(), id);
        let page: PagedResults = self.get_json(&path, &[])?;
        Ok(page
            .results
            .into_iter()
            .map(|e| Self::candidate_with_kind(e, kind))
            .collect())
    }

    fn similar(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> Result<Vec<TitleCandidate>, ProviderLookupError> {
        let path = format!("/{}/{}/similar", kind.path_segment(), id);
        let page: PagedResults = self.get_json(&path, &[])?;
        Ok(page
            .results
            .into_iter()
            .map(|e| Self::candidate_with_kind(e, kind))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(json: serde_json::Value) -> TitleEntry {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_movie_entry_conversion() {
        let cand = TmdbCatalog::candidate_from_multi(entry(serde_json::json!({
            "id": 27205,
            "media_type": "movie",
            "title": "Inception",
            "release_date": "2010-07-16",
            "poster_path": "/inception.jpg"
        })));

        assert_eq!(cand.id, 27205);
        assert_eq!(cand.kind, MediaKind::Movie);
        assert!(cand.is_title);
        assert_eq!(cand.title, "Inception");
        assert_eq!(cand.year, Some(2010));
        assert_eq!(cand.poster_path.as_deref(), Some("/inception.jpg"));
    }

    #[test]
    fn test_series_entry_conversion() {
        let cand = TmdbCatalog::candidate_from_multi(entry(serde_json::json!({
            "id": 1396,
            "media_type": "tv",
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20"
        })));

        assert_eq!(cand.kind, MediaKind::Series);
        assert!(cand.is_title);
        assert_eq!(cand.title, "Breaking Bad");
        assert_eq!(cand.year, Some(2008));
        assert!(cand.poster_path.is_none());
    }

    #[test]
    fn test_person_entry_is_not_a_title() {
        let cand = TmdbCatalog::candidate_from_multi(entry(serde_json::json!({
            "id": 525,
            "media_type": "person",
            "name": "Christopher Nolan"
        })));

        assert!(!cand.is_title);
        // People carry series-style fields; the name still comes through
        assert_eq!(cand.title, "Christopher Nolan");
        assert_eq!(cand.kind, MediaKind::Series);
    }

    #[test]
    fn test_missing_title_falls_back_to_original_then_unknown() {
        let cand = TmdbCatalog::candidate_from_multi(entry(serde_json::json!({
            "id": 1,
            "media_type": "movie",
            "original_title": "Le Samouraï"
        })));
        assert_eq!(cand.title, "Le Samouraï");

        let cand = TmdbCatalog::candidate_from_multi(entry(serde_json::json!({
            "id": 2,
            "media_type": "movie"
        })));
        assert_eq!(cand.title, "Unknown");
    }

    #[test]
    fn test_recommendation_entry_inherits_kind() {
        let cand = TmdbCatalog::candidate_with_kind(
            entry(serde_json::json!({
                "id": 157336,
                "title": "Interstellar",
                "release_date": "2014-11-05"
            })),
            MediaKind::Movie,
        );
        assert_eq!(cand.kind, MediaKind::Movie);
        assert!(cand.is_title);
        assert_eq!(cand.title, "Interstellar");
    }

    #[test]
    fn test_listing_conversion_drops_nameless_entries() {
        let buckets: RegionBuckets = serde_json::from_value(serde_json::json!({
            "flatrate": [
                { "provider_name": "Netflix" },
                { "provider_id": 9 }
            ],
            "rent": [ { "provider_name": "Apple TV" } ]
        }))
        .unwrap();

        let listing = TmdbCatalog::listing_from_buckets(buckets);
        assert_eq!(listing.flatrate, vec!["Netflix".to_string()]);
        assert_eq!(listing.rent, vec!["Apple TV".to_string()]);
        assert!(listing.buy.is_empty());
        assert!(listing.ads.is_empty());
    }

    #[test]
    fn test_absent_region_yields_empty_listing() {
        let mut response: WatchProvidersResponse = serde_json::from_value(serde_json::json!({
            "results": {
                "US": { "flatrate": [ { "provider_name": "Hulu" } ] }
            }
        }))
        .unwrap();

        assert!(response.results.remove("DE").is_none());
        let us = response.results.remove("US").unwrap();
        assert_eq!(TmdbCatalog::listing_from_buckets(us).flatrate, vec!["Hulu".to_string()]);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2010-07-16"), Some(2010));
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("n/a"), None);
    }
}
