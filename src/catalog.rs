//! Streaming service catalog
//!
//! This module defines the closed set of streaming services the tool knows
//! about, the supported regions, and the classification function that maps
//! raw provider names from the metadata API onto service identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a streaming service the user may subscribe to.
///
/// This is a fixed, closed set: one variant per supported brand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ServiceId {
    Netflix,
    Prime,
    Disney,
    Hulu,
    AppleTv,
    Max,
}

/// Static definition of a streaming service.
///
/// Carries everything a UI layer needs to render a service: display name,
/// brand color token, badge text, and the canonical home URL used when the
/// metadata provider does not supply a deep link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub name: &'static str,
    /// CSS variable name for the brand color (HSL)
    pub color_token: &'static str,
    /// Simple badge text logo
    pub badge: &'static str,
    pub home_url: &'static str,
}

/// The full service catalog, defined once at process start.
pub const SERVICES: [ServiceInfo; 6] = [
    ServiceInfo {
        id: ServiceId::Netflix,
        name: "Netflix",
        color_token: "--brand-netflix",
        badge: "N",
        home_url: "https://www.netflix.com/",
    },
    ServiceInfo {
        id: ServiceId::Prime,
        name: "Prime Video",
        color_token: "--brand-prime",
        badge: "P",
        home_url: "https://www.primevideo.com/",
    },
    ServiceInfo {
        id: ServiceId::Disney,
        name: "Disney+",
        color_token: "--brand-disney",
        badge: "D+",
        home_url: "https://www.disneyplus.com/",
    },
    ServiceInfo {
        id: ServiceId::Hulu,
        name: "Hulu",
        color_token: "--brand-hulu",
        badge: "H",
        home_url: "https://www.hulu.com/",
    },
    ServiceInfo {
        id: ServiceId::AppleTv,
        name: "Apple TV+",
        color_token: "--brand-appletv",
        badge: "TV+",
        home_url: "https://tv.apple.com/",
    },
    ServiceInfo {
        id: ServiceId::Max,
        name: "HBO Max",
        color_token: "--brand-max",
        badge: "M",
        home_url: "https://www.max.com/",
    },
];

impl ServiceId {
    /// Looks up the static definition for this service.
    pub fn info(self) -> &'static ServiceInfo {
        let idx = match self {
            ServiceId::Netflix => 0,
            ServiceId::Prime => 1,
            ServiceId::Disney => 2,
            ServiceId::Hulu => 3,
            ServiceId::AppleTv => 4,
            ServiceId::Max => 5,
        };
        &SERVICES[idx]
    }

    /// The canonical home URL for this service.
    pub fn home_url(self) -> &'static str {
        self.info().home_url
    }

    /// All known services, in catalog order.
    pub fn all() -> impl Iterator<Item = ServiceId> {
        SERVICES.iter().map(|s| s.id)
    }

    /// Parses a service identifier from its lowercase string form
    /// (e.g. `"netflix"`, `"appletv"`).
    pub fn parse(s: &str) -> Option<ServiceId> {
        match s {
            "netflix" => Some(ServiceId::Netflix),
            "prime" => Some(ServiceId::Prime),
            "disney" => Some(ServiceId::Disney),
            "hulu" => Some(ServiceId::Hulu),
            "appletv" => Some(ServiceId::AppleTv),
            "max" => Some(ServiceId::Max),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

/// Classifies a raw provider name from the metadata API into a service
/// identifier.
///
/// Matching is case-insensitive substring matching against known brand
/// tokens. The rule order matters: earlier rules win when a name contains
/// several tokens (e.g. "Max Amazon Channel" maps to Prime, not Max).
/// Unrecognized names map to `None` and are dropped by callers.
pub fn service_from_provider_name(name: &str) -> Option<ServiceId> {
    let n = name.to_lowercase();
    if n.is_empty() {
        return None;
    }
    if n.contains("netflix") {
        return Some(ServiceId::Netflix);
    }
    if n.contains("amazon") || n.contains("prime video") {
        return Some(ServiceId::Prime);
    }
    if n.contains("disney") {
        return Some(ServiceId::Disney);
    }
    if n.contains("hulu") {
        return Some(ServiceId::Hulu);
    }
    if n.contains("apple tv") {
        return Some(ServiceId::AppleTv);
    }
    if n.contains("hbo max") || n.contains("max") {
        return Some(ServiceId::Max);
    }
    None
}

/// A region for which the metadata provider reports availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub code: &'static str,
    pub label: &'static str,
}

/// The fixed list of supported regions.
pub const REGIONS: [Region; 7] = [
    Region { code: "US", label: "United States" },
    Region { code: "CA", label: "Canada" },
    Region { code: "BR", label: "Brazil" },
    Region { code: "UK", label: "United Kingdom" },
    Region { code: "AU", label: "Australia" },
    Region { code: "DK", label: "Denmark" },
    Region { code: "SG", label: "Singapore" },
];
