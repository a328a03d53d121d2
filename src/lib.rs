//! WhereToWatch - Find out where a movie or TV show streams
//!
//! This library answers one question: given a title, a region and the
//! streaming services a user subscribes to, can they watch it right now?
//! And if not, what are the closest options (other titles on their
//! services, or renting/buying/free streams elsewhere)?

mod catalog;
mod provider_lookup;
mod resolver;
mod saved;
mod store;

use provider_lookup::TmdbCatalog;
use std::collections::BTreeSet;

// Re-export error types
pub use provider_lookup::ProviderLookupError;
pub use saved::SavedError;
pub use store::StoreError;

// Re-export the service/region catalog
pub use catalog::{REGIONS, Region, SERVICES, ServiceId, ServiceInfo, service_from_provider_name};

// Re-export provider-facing types
pub use provider_lookup::{MediaKind, RegionListing, TitleCandidate, TitleCatalog};

// Re-export resolution types
pub use resolver::{
    AlternativeTitle, Availability, Offer, OtherOffers, Quality, Resolution, SuggestedTitle,
    TitleSummary, resolve,
};

// Re-export persistence types and operations
pub use saved::{
    BackupDocument, HistoryEntry, Preferences, SavedItem, ToggleOutcome, clear_history,
    clear_preferences, export_saved, import_saved, is_saved, load_preferences, push_history,
    recent_searches, remove_saved, save_preferences, saved_items, toggle_saved,
};
pub use store::{FileStore, KeyValueStore, MemoryStore};

use thiserror::Error;

/// Progress event emitted during a lookup
///
/// These events allow library users to track the sequence of provider
/// calls and provide feedback while a resolution is in flight.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Searching the provider for the query
    Searching { query: String },

    /// The search returned nothing
    NoResults,

    /// A primary title was picked from the search results
    PrimarySelected { title: String, kind: MediaKind },

    /// Fetching the regional provider listing for the primary title
    CheckingProviders { title: String },

    /// The title streams on one or more selected services
    DirectHit { service_count: usize },

    /// A search result matching the user's services was collected
    AlternativeMatched { title: String },

    /// Fetching related-title suggestions
    FetchingSuggestions,

    /// A suggestion's listing could not be fetched; it is kept without
    /// offers
    SuggestionListingFailed { title: String },

    /// Resolution finished
    Complete { available: bool },
}

/// Top-level error type for WhereToWatch operations
#[derive(Debug, Error)]
pub enum WhereToWatchError {
    /// No provider credential is configured; the caller must prompt for
    /// configuration before retrying
    #[error("No API credential configured. Set one in your preferences.")]
    MissingCredential,

    /// Error while talking to the metadata provider
    #[error("Provider lookup error: {0}")]
    ProviderLookup(#[from] ProviderLookupError),

    /// Error in the persistence layer
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error while working with saved records
    #[error("Saved data error: {0}")]
    Saved(#[from] SavedError),
}

/// Looks up where a title can be watched.
///
/// This is the one-call entry point: it validates the credential, builds a
/// TMDB-backed catalog and runs the availability resolution. Progress
/// events are emitted through the provided callback, allowing library
/// users to display status or remain silent.
///
/// The caller owns persistence: this function records nothing, so search
/// history and bookmarks stay the caller's decision.
///
/// # Arguments
///
/// * `query` - Free-text title query
/// * `region` - Region code (e.g. "US")
/// * `selected` - The user's selected services
/// * `credential` - TMDB API read access token
/// * `progress_callback` - Closure called with progress events (can be
///   empty for silent operation)
///
/// # Examples
///
/// ```no_run
/// use std::collections::BTreeSet;
/// use where_to_watch::{ProgressEvent, ServiceId, check_availability};
///
/// let selected: BTreeSet<ServiceId> = [ServiceId::Netflix].into_iter().collect();
/// let resolution = check_availability(
///     "Inception",
///     "US",
///     &selected,
///     "tmdb-read-token",
///     |event| {
///         if let ProgressEvent::Complete { available } = event {
///             println!("available: {available}");
///         }
///     },
/// ).unwrap();
///
/// println!("{}", resolution.title.title);
/// ```
pub fn check_availability<F>(
    query: &str,
    region: &str,
    selected: &BTreeSet<ServiceId>,
    credential: &str,
    mut progress_callback: F,
) -> Result<Resolution, WhereToWatchError>
where
    F: FnMut(ProgressEvent),
{
    if credential.trim().is_empty() {
        return Err(WhereToWatchError::MissingCredential);
    }

    let catalog = TmdbCatalog::new(credential);
    let resolution = resolver::resolve(&catalog, query, region, selected, &mut progress_callback)?;
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_credential_is_rejected_before_any_request() {
        let selected = BTreeSet::new();
        let err = check_availability("Inception", "US", &selected, "", |_| {}).unwrap_err();
        assert!(matches!(err, WhereToWatchError::MissingCredential));

        let err = check_availability("Inception", "US", &selected, "   ", |_| {}).unwrap_err();
        assert!(matches!(err, WhereToWatchError::MissingCredential));
    }
}
