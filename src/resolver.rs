//! Availability resolution
//!
//! Given a free-text query, a region, and the user's selected services,
//! this module determines whether the best-matching title streams on one of
//! those services, and if not, assembles alternatives (other titles that do
//! match) and other ways to watch (rent/buy/free/ads). Search-result order
//! from the provider is treated as relevance order and preserved
//! throughout; the resolver filters, it never re-ranks.

use crate::ProgressEvent;
use crate::catalog::{ServiceId, service_from_provider_name};
use crate::provider_lookup::{
    MediaKind, ProviderLookupError, RegionListing, TitleCandidate, TitleCatalog, poster_url,
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// How many search results after the primary are probed for alternatives.
const ALTERNATIVE_SCAN_LIMIT: usize = 7;
/// How many alternatives are collected before the scan stops.
const ALTERNATIVE_RESULT_LIMIT: usize = 3;
/// How many related-title candidates are probed.
const SUGGESTION_POOL_LIMIT: usize = 12;
/// How many related titles are surfaced.
const SUGGESTION_RESULT_LIMIT: usize = 8;
/// How many offers a non-matching suggestion surfaces.
const FALLBACK_OFFER_LIMIT: usize = 3;

/// Stream quality tier of an offer.
///
/// The metadata provider does not expose quality per offer, so offers are
/// always constructed as HD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Quality {
    #[serde(rename = "HD")]
    Hd,
    #[serde(rename = "4K")]
    Uhd,
}

/// A concrete way to watch: a service, a quality tier, and a watch URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Offer {
    pub service: ServiceId,
    pub quality: Quality,
    pub url: String,
}

impl Offer {
    /// Builds the offer shown for a subscription service: HD quality and
    /// the service's canonical home URL.
    fn subscription(service: ServiceId) -> Self {
        Self {
            service,
            quality: Quality::Hd,
            url: service.home_url().to_string(),
        }
    }
}

/// Identity of the title a resolution is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleSummary {
    pub id: u64,
    pub title: String,
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

/// A different title shown because it matches the user's services when the
/// primary title does not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeTitle {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    /// Offers on the user's selected services
    pub offers: Vec<Offer>,
}

/// A related/recommended title, surfaced regardless of availability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedTitle {
    pub id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    /// May be empty when no providers were discoverable for the title
    pub offers: Vec<Offer>,
}

/// Non-subscription ways to watch an unavailable title.
///
/// Each category is present only when non-empty; the `Option` makes that
/// invariant explicit rather than conventional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OtherOffers {
    /// Subscription services that carry the title but are not selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_flatrate: Option<Vec<Offer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent: Option<Vec<Offer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy: Option<Vec<Offer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free: Option<Vec<Offer>>,
    /// Free with ads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads: Option<Vec<Offer>>,
}

impl OtherOffers {
    pub fn is_empty(&self) -> bool {
        self.other_flatrate.is_none()
            && self.rent.is_none()
            && self.buy.is_none()
            && self.free.is_none()
            && self.ads.is_none()
    }
}

/// Whether and how the primary title can be watched.
///
/// The two variants are mutually exclusive by construction: an available
/// result never carries alternatives or other-offer categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Availability {
    /// The title streams on at least one selected service.
    Available {
        /// Offers restricted to the selected services
        offers: Vec<Offer>,
        suggestions: Vec<SuggestedTitle>,
    },
    /// The title does not stream on any selected service.
    Unavailable {
        alternatives: Vec<AlternativeTitle>,
        other: OtherOffers,
        suggestions: Vec<SuggestedTitle>,
    },
}

/// The outcome of one resolution call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub title: TitleSummary,
    pub availability: Availability,
}

impl Resolution {
    pub fn is_available(&self) -> bool {
        matches!(self.availability, Availability::Available { .. })
    }

    /// The valid empty result for a query the provider knows nothing
    /// about: unavailable, echoing the query, with nothing populated.
    fn not_found(query: &str) -> Self {
        Self {
            title: TitleSummary {
                id: 0,
                title: query.to_string(),
                kind: MediaKind::Movie,
                year: None,
                poster_url: None,
            },
            availability: Availability::Unavailable {
                alternatives: Vec::new(),
                other: OtherOffers::default(),
                suggestions: Vec::new(),
            },
        }
    }
}

/// Resolves where a title can be watched.
///
/// Issues a multi search, picks the primary result, fetches its regional
/// provider listing and decides between the available and unavailable
/// shapes. Only the search and the primary listing fetch can fail the
/// call; every per-candidate fetch during alternative scanning and
/// suggestion enrichment degrades to "this candidate contributes nothing".
///
/// # Arguments
///
/// * `catalog` - The metadata-provider client
/// * `query` - Free-text title query
/// * `region` - Region code selecting which availability data to read
/// * `selected` - The user's selected services, fixed for this call
/// * `progress` - Closure called with progress events
pub fn resolve<C, F>(
    catalog: &C,
    query: &str,
    region: &str,
    selected: &BTreeSet<ServiceId>,
    progress: &mut F,
) -> Result<Resolution, ProviderLookupError>
where
    C: TitleCatalog,
    F: FnMut(ProgressEvent),
{
    progress(ProgressEvent::Searching {
        query: query.to_string(),
    });
    let candidates = catalog.search(query)?;

    let Some(primary) = candidates
        .iter()
        .find(|c| c.is_title)
        .or_else(|| candidates.first())
        .cloned()
    else {
        progress(ProgressEvent::NoResults);
        return Ok(Resolution::not_found(query));
    };

    progress(ProgressEvent::PrimarySelected {
        title: primary.title.clone(),
        kind: primary.kind,
    });

    let summary = TitleSummary {
        id: primary.id,
        title: primary.title.clone(),
        kind: primary.kind,
        year: primary.year,
        poster_url: primary.poster_path.as_deref().map(|p| poster_url(p, 500)),
    };

    progress(ProgressEvent::CheckingProviders {
        title: primary.title.clone(),
    });
    let listing = catalog.region_listing(primary.kind, primary.id, region)?;
    let flatrate = map_provider_names(listing.flatrate.iter().map(String::as_str));
    let matched = intersect(&flatrate, selected);

    if !matched.is_empty() {
        let offers = subscription_offers(&matched);
        progress(ProgressEvent::DirectHit {
            service_count: offers.len(),
        });
        let suggestions = related_suggestions(catalog, &primary, region, selected, progress);
        progress(ProgressEvent::Complete { available: true });
        return Ok(Resolution {
            title: summary,
            availability: Availability::Available {
                offers,
                suggestions,
            },
        });
    }

    let other = other_offer_categories(&flatrate, &listing, selected);
    let alternatives = scan_alternatives(catalog, &candidates, region, selected, progress);
    let suggestions = related_suggestions(catalog, &primary, region, selected, progress);
    progress(ProgressEvent::Complete { available: false });

    Ok(Resolution {
        title: summary,
        availability: Availability::Unavailable {
            alternatives,
            other,
            suggestions,
        },
    })
}

/// Maps raw provider names to service identifiers, dropping unrecognized
/// names and duplicates while preserving first-seen order.
fn map_provider_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<ServiceId> {
    let mut seen = BTreeSet::new();
    names
        .filter_map(service_from_provider_name)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// The subset of `ids` present in `selected`, preserving order.
fn intersect(ids: &[ServiceId], selected: &BTreeSet<ServiceId>) -> Vec<ServiceId> {
    ids.iter().copied().filter(|s| selected.contains(s)).collect()
}

fn subscription_offers(ids: &[ServiceId]) -> Vec<Offer> {
    ids.iter().copied().map(Offer::subscription).collect()
}

fn non_empty(offers: Vec<Offer>) -> Option<Vec<Offer>> {
    if offers.is_empty() { None } else { Some(offers) }
}

/// Builds the categorized non-subscription breakdown for the unavailable
/// shape. Every category is mapped, de-duplicated, and omitted when empty.
fn other_offer_categories(
    flatrate: &[ServiceId],
    listing: &RegionListing,
    selected: &BTreeSet<ServiceId>,
) -> OtherOffers {
    let unselected: Vec<ServiceId> = flatrate
        .iter()
        .copied()
        .filter(|s| !selected.contains(s))
        .collect();

    let bucket = |names: &[String]| {
        non_empty(subscription_offers(&map_provider_names(
            names.iter().map(String::as_str),
        )))
    };

    OtherOffers {
        other_flatrate: non_empty(subscription_offers(&unselected)),
        rent: bucket(&listing.rent),
        buy: bucket(&listing.buy),
        free: bucket(&listing.free),
        ads: bucket(&listing.ads),
    }
}

/// Scans the search results after the primary for titles that do stream on
/// the selected services.
///
/// Probes at most [`ALTERNATIVE_SCAN_LIMIT`] candidates in relevance order
/// and stops once [`ALTERNATIVE_RESULT_LIMIT`] matches are collected. A
/// failed listing fetch counts as "no match for this candidate".
fn scan_alternatives<C, F>(
    catalog: &C,
    candidates: &[TitleCandidate],
    region: &str,
    selected: &BTreeSet<ServiceId>,
    progress: &mut F,
) -> Vec<AlternativeTitle>
where
    C: TitleCatalog,
    F: FnMut(ProgressEvent),
{
    let mut alternatives = Vec::new();

    for cand in candidates.iter().skip(1).take(ALTERNATIVE_SCAN_LIMIT) {
        if alternatives.len() >= ALTERNATIVE_RESULT_LIMIT {
            break;
        }

        let listing = match catalog.region_listing(cand.kind, cand.id, region) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(title = %cand.title, error = %e, "alternative listing fetch failed");
                continue;
            }
        };

        let flatrate = map_provider_names(listing.flatrate.iter().map(String::as_str));
        let matched = intersect(&flatrate, selected);
        if matched.is_empty() {
            continue;
        }

        progress(ProgressEvent::AlternativeMatched {
            title: cand.title.clone(),
        });
        alternatives.push(AlternativeTitle {
            title: cand.title.clone(),
            year: cand.year,
            poster_url: cand.poster_path.as_deref().map(|p| poster_url(p, 300)),
            offers: subscription_offers(&matched),
        });
    }

    alternatives
}

/// Best-effort related-title enrichment; never fails the parent call.
///
/// Prefers the curated recommendations endpoint and falls back to similar
/// titles when it comes back empty. Candidates whose listing fetch fails
/// are kept with an empty offer list. Candidates matching the selected
/// services come first; the combined list is truncated to
/// [`SUGGESTION_RESULT_LIMIT`].
fn related_suggestions<C, F>(
    catalog: &C,
    primary: &TitleCandidate,
    region: &str,
    selected: &BTreeSet<ServiceId>,
    progress: &mut F,
) -> Vec<SuggestedTitle>
where
    C: TitleCatalog,
    F: FnMut(ProgressEvent),
{
    progress(ProgressEvent::FetchingSuggestions);

    let mut pool = match catalog.recommendations(primary.kind, primary.id) {
        Ok(pool) => pool,
        Err(e) => {
            warn!(title = %primary.title, error = %e, "recommendations fetch failed");
            return Vec::new();
        }
    };
    if pool.is_empty() {
        pool = match catalog.similar(primary.kind, primary.id) {
            Ok(pool) => pool,
            Err(e) => {
                warn!(title = %primary.title, error = %e, "similar titles fetch failed");
                return Vec::new();
            }
        };
    }
    pool.truncate(SUGGESTION_POOL_LIMIT);

    let mut priority = Vec::new();
    let mut other = Vec::new();

    for cand in pool {
        let base = SuggestedTitle {
            id: cand.id,
            title: cand.title.clone(),
            year: cand.year,
            poster_url: cand.poster_path.as_deref().map(|p| poster_url(p, 300)),
            offers: Vec::new(),
        };

        let listing = match catalog.region_listing(cand.kind, cand.id, region) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(title = %cand.title, error = %e, "suggestion listing fetch failed");
                progress(ProgressEvent::SuggestionListingFailed {
                    title: cand.title.clone(),
                });
                other.push(base);
                continue;
            }
        };

        // Suggestions consider every bucket, not just flatrate
        let discoverable = map_provider_names(listing.all_names());

        if !selected.is_empty() {
            let matched = intersect(&discoverable, selected);
            if !matched.is_empty() {
                priority.push(SuggestedTitle {
                    offers: subscription_offers(&matched),
                    ..base
                });
            } else if !discoverable.is_empty() {
                let first: Vec<ServiceId> = discoverable
                    .iter()
                    .copied()
                    .take(FALLBACK_OFFER_LIMIT)
                    .collect();
                other.push(SuggestedTitle {
                    offers: subscription_offers(&first),
                    ..base
                });
            } else {
                other.push(base);
            }
        } else if !discoverable.is_empty() {
            let first: Vec<ServiceId> = discoverable
                .iter()
                .copied()
                .take(FALLBACK_OFFER_LIMIT)
                .collect();
            priority.push(SuggestedTitle {
                offers: subscription_offers(&first),
                ..base
            });
        } else {
            other.push(base);
        }
    }

    let mut combined = priority;
    combined.append(&mut other);
    combined.truncate(SUGGESTION_RESULT_LIMIT);
    combined
}
