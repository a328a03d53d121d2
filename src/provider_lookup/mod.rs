//! Data structures and traits for upstream title/availability lookups.
//!
//! This module provides structures to represent search candidates and
//! per-region provider listings, as well as the trait implemented by
//! concrete metadata-provider clients.

mod tmdb;
mod tmdb_types;

pub use tmdb::TmdbCatalog;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the metadata provider.
#[derive(Debug, Error)]
pub enum ProviderLookupError {
    /// Request to the metadata provider failed (transport level)
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The provider answered with a non-success HTTP status
    #[error("Provider returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

/// Whether a title is a movie or a series.
///
/// This determines which endpoint family (`movie/...` vs `tv/...`) is used
/// for listings and recommendations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[serde(rename = "tv")]
    Series,
}

impl MediaKind {
    /// The URL path segment the provider uses for this kind.
    pub fn path_segment(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }

    /// Human-readable label ("Movie" / "TV").
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Movie => "Movie",
            MediaKind::Series => "TV",
        }
    }
}

/// A title returned by the provider's search or recommendation endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleCandidate {
    /// The provider's numeric identifier for this title
    pub id: u64,
    /// Classified media kind (movie unless the entry carries series fields)
    pub kind: MediaKind,
    /// Whether the provider explicitly tagged this entry as movie or tv.
    /// Multi search can also return people; those carry `false` here.
    pub is_title: bool,
    /// Display title
    pub title: String,
    /// Release year, when a release date was present
    pub year: Option<u16>,
    /// Raw poster path; use [`poster_url`] to build a full image URL
    pub poster_path: Option<String>,
}

/// Per-region availability for one title: raw provider names bucketed by
/// acquisition method. An absent region yields the empty default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionListing {
    /// Subscription-included providers
    pub flatrate: Vec<String>,
    pub rent: Vec<String>,
    pub buy: Vec<String>,
    pub free: Vec<String>,
    /// Free with ads
    pub ads: Vec<String>,
}

impl RegionListing {
    /// All buckets concatenated, in a fixed order.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.flatrate
            .iter()
            .chain(&self.rent)
            .chain(&self.buy)
            .chain(&self.free)
            .chain(&self.ads)
            .map(String::as_str)
    }
}

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

/// Builds a full poster image URL for the given raw poster path and pixel
/// width (e.g. 300 or 500).
pub fn poster_url(path: &str, width: u16) -> String {
    format!("{IMAGE_BASE}/w{width}{path}")
}

/// Trait for metadata providers that can search titles and report regional
/// availability.
///
/// The resolver is generic over this trait so it can be exercised against
/// an in-memory fake without network access.
pub trait TitleCatalog {
    /// Runs a multi-type text search, returning candidates in the
    /// provider's relevance order.
    fn search(&self, query: &str) -> Result<Vec<TitleCandidate>, ProviderLookupError>;

    /// Fetches the availability listing for one title in one region.
    ///
    /// A title with no data for the region yields an empty listing, not an
    /// error.
    fn region_listing(
        &self,
        kind: MediaKind,
        id: u64,
        region: &str,
    ) -> Result<RegionListing, ProviderLookupError>;

    /// Fetches the provider's curated recommendations for a title.
    fn recommendations(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> Result<Vec<TitleCandidate>, ProviderLookupError>;

    /// Fetches titles similar to the given one. Used as a fallback when
    /// [`TitleCatalog::recommendations`] comes back empty.
    fn similar(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> Result<Vec<TitleCandidate>, ProviderLookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_path_segments() {
        assert_eq!(MediaKind::Movie.path_segment(), "movie");
        assert_eq!(MediaKind::Series.path_segment(), "tv");
    }

    #[test]
    fn test_media_kind_serde_form() {
        assert_eq!(serde_json::to_string(&MediaKind::Movie).unwrap(), "\"movie\"");
        assert_eq!(serde_json::to_string(&MediaKind::Series).unwrap(), "\"tv\"");
        let kind: MediaKind = serde_json::from_str("\"tv\"").unwrap();
        assert_eq!(kind, MediaKind::Series);
    }

    #[test]
    fn test_poster_url() {
        assert_eq!(
            poster_url("/abc.jpg", 300),
            "https://image.tmdb.org/t/p/w300/abc.jpg"
        );
    }

    #[test]
    fn test_all_names_covers_every_bucket() {
        let listing = RegionListing {
            flatrate: vec!["a".into()],
            rent: vec!["b".into()],
            buy: vec!["c".into()],
            free: vec!["d".into()],
            ads: vec!["e".into()],
        };
        let names: Vec<&str> = listing.all_names().collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }
}
