//! Preferences, saved titles and search history
//!
//! Everything here is a thin CRUD layer over an injected [`KeyValueStore`]:
//! a preferences record under one key, a capped list of saved-title
//! bookmarks under another, and a capped list of recent queries under a
//! third. Saved lists can be exported to and imported from a JSON backup
//! document, merged by the (id, kind) composite key.

use crate::catalog::ServiceId;
use crate::provider_lookup::MediaKind;
use crate::store::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

const PREFS_KEY: &str = "wtw_prefs_v1";
const SAVED_KEY: &str = "wtw:saved";
const HISTORY_KEY: &str = "wtw:history";

const MAX_SAVED: usize = 300;
const MAX_HISTORY: usize = 25;

/// Version stamp written into backup documents.
const BACKUP_VERSION: &str = "1.0";

/// Errors that can occur while working with persisted records
#[derive(Debug, Error)]
pub enum SavedError {
    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Failed to serialize a record for storage
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A backup file could not be understood
    #[error("Invalid backup file: {0}")]
    InvalidBackup(String),
}

/// The user's persisted preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Region code availability data is read for
    pub region: String,
    /// Selected (subscribed) services
    #[serde(default)]
    pub services: BTreeSet<ServiceId>,
    /// Metadata-provider access credential
    #[serde(default)]
    pub credential: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            region: "US".to_string(),
            services: BTreeSet::new(),
            credential: String::new(),
        }
    }
}

/// A bookmarked title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    /// Unix timestamp in milliseconds
    pub saved_at: i64,
}

/// A recorded search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The query as typed
    pub query: String,
    /// The primary result's identity, when the search found one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<MediaKind>,
    /// Unix timestamp in milliseconds
    pub at: i64,
}

/// The JSON document produced by export and consumed by import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    /// RFC 3339 export timestamp
    pub exported: String,
    pub items: Vec<SavedItem>,
}

/// Outcome of toggling a bookmark.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    /// Whether the item ended up saved
    pub saved: bool,
    pub item: SavedItem,
}

/// Loads preferences, falling back to defaults when nothing is stored or
/// the stored record is unreadable.
pub fn load_preferences(store: &impl KeyValueStore) -> Result<Preferences, SavedError> {
    let Some(raw) = store.get(PREFS_KEY)? else {
        return Ok(Preferences::default());
    };
    match serde_json::from_str(&raw) {
        Ok(prefs) => Ok(prefs),
        Err(e) => {
            warn!(error = %e, "stored preferences are unreadable, using defaults");
            Ok(Preferences::default())
        }
    }
}

pub fn save_preferences(
    store: &impl KeyValueStore,
    prefs: &Preferences,
) -> Result<(), SavedError> {
    let raw = serde_json::to_string(prefs)?;
    store.set(PREFS_KEY, &raw)?;
    Ok(())
}

/// Removes the stored preferences, restoring defaults on the next load.
pub fn clear_preferences(store: &impl KeyValueStore) -> Result<(), SavedError> {
    store.remove(PREFS_KEY)?;
    Ok(())
}

/// Returns the saved-title list, newest first. An unreadable stored list
/// yields an empty one.
pub fn saved_items(store: &impl KeyValueStore) -> Result<Vec<SavedItem>, SavedError> {
    let Some(raw) = store.get(SAVED_KEY)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!(error = %e, "stored saved list is unreadable, starting empty");
            Ok(Vec::new())
        }
    }
}

fn write_saved(store: &impl KeyValueStore, mut items: Vec<SavedItem>) -> Result<(), SavedError> {
    items.truncate(MAX_SAVED);
    let raw = serde_json::to_string(&items)?;
    store.set(SAVED_KEY, &raw)?;
    Ok(())
}

/// Saves the given title, or removes it if it is already saved.
pub fn toggle_saved(
    store: &impl KeyValueStore,
    id: u64,
    kind: MediaKind,
    title: &str,
    year: Option<u16>,
    poster: Option<String>,
) -> Result<ToggleOutcome, SavedError> {
    let mut items = saved_items(store)?;

    if let Some(pos) = items.iter().position(|s| s.id == id && s.kind == kind) {
        let removed = items.remove(pos);
        write_saved(store, items)?;
        return Ok(ToggleOutcome {
            saved: false,
            item: removed,
        });
    }

    let item = SavedItem {
        id,
        kind,
        title: title.to_string(),
        year,
        poster,
        saved_at: chrono::Utc::now().timestamp_millis(),
    };
    items.insert(0, item.clone());
    write_saved(store, items)?;
    Ok(ToggleOutcome { saved: true, item })
}

/// Whether a title is currently bookmarked.
pub fn is_saved(store: &impl KeyValueStore, id: u64, kind: MediaKind) -> Result<bool, SavedError> {
    Ok(saved_items(store)?
        .iter()
        .any(|s| s.id == id && s.kind == kind))
}

/// Removes a bookmark, returning it if it existed.
pub fn remove_saved(
    store: &impl KeyValueStore,
    id: u64,
    kind: MediaKind,
) -> Result<Option<SavedItem>, SavedError> {
    let mut items = saved_items(store)?;
    let Some(pos) = items.iter().position(|s| s.id == id && s.kind == kind) else {
        return Ok(None);
    };
    let removed = items.remove(pos);
    write_saved(store, items)?;
    Ok(Some(removed))
}

/// Returns recent searches, newest first.
pub fn recent_searches(store: &impl KeyValueStore) -> Result<Vec<HistoryEntry>, SavedError> {
    let Some(raw) = store.get(HISTORY_KEY)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!(error = %e, "stored search history is unreadable, starting empty");
            Ok(Vec::new())
        }
    }
}

/// Records a search at the front of the history.
///
/// An earlier entry for the same query (case-insensitive) is replaced, and
/// the list is capped at the most recent entries.
pub fn push_history(
    store: &impl KeyValueStore,
    query: &str,
    top_result: Option<(u64, MediaKind)>,
) -> Result<(), SavedError> {
    let mut entries = recent_searches(store)?;
    entries.retain(|h| !h.query.eq_ignore_ascii_case(query));

    entries.insert(
        0,
        HistoryEntry {
            query: query.to_string(),
            id: top_result.map(|(id, _)| id),
            kind: top_result.map(|(_, kind)| kind),
            at: chrono::Utc::now().timestamp_millis(),
        },
    );
    entries.truncate(MAX_HISTORY);

    let raw = serde_json::to_string(&entries)?;
    store.set(HISTORY_KEY, &raw)?;
    Ok(())
}

pub fn clear_history(store: &impl KeyValueStore) -> Result<(), SavedError> {
    store.remove(HISTORY_KEY)?;
    Ok(())
}

/// Builds the backup document for the current saved list.
pub fn export_saved(store: &impl KeyValueStore) -> Result<BackupDocument, SavedError> {
    Ok(BackupDocument {
        version: BACKUP_VERSION.to_string(),
        exported: chrono::Utc::now().to_rfc3339(),
        items: saved_items(store)?,
    })
}

/// Imports a backup document, merging its items into the saved list.
///
/// Items whose (id, kind) is already present are skipped; newly imported
/// items are appended after the existing ones. Returns the number of items
/// actually added.
pub fn import_saved(store: &impl KeyValueStore, content: &str) -> Result<usize, SavedError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| SavedError::InvalidBackup(format!("failed to parse backup file: {e}")))?;

    let Some(items_value) = value.get("items") else {
        return Err(SavedError::InvalidBackup(
            "backup file has no items list".to_string(),
        ));
    };
    if !items_value.is_array() {
        return Err(SavedError::InvalidBackup(
            "items is not a list".to_string(),
        ));
    }
    let incoming: Vec<SavedItem> = serde_json::from_value(items_value.clone())
        .map_err(|e| SavedError::InvalidBackup(format!("malformed item in backup: {e}")))?;

    let mut existing = saved_items(store)?;
    let present: BTreeSet<(u64, MediaKind)> =
        existing.iter().map(|s| (s.id, s.kind)).collect();

    let new_items: Vec<SavedItem> = incoming
        .into_iter()
        .filter(|item| !present.contains(&(item.id, item.kind)))
        .collect();
    let added = new_items.len();

    existing.extend(new_items);
    write_saved(store, existing)?;
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn item(id: u64, kind: MediaKind, title: &str) -> SavedItem {
        SavedItem {
            id,
            kind,
            title: title.to_string(),
            year: Some(2010),
            poster: None,
            saved_at: 1,
        }
    }

    #[test]
    fn test_preferences_default_and_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(load_preferences(&store).unwrap(), Preferences::default());

        let prefs = Preferences {
            region: "CA".to_string(),
            services: [ServiceId::Netflix, ServiceId::Hulu].into_iter().collect(),
            credential: "token".to_string(),
        };
        save_preferences(&store, &prefs).unwrap();
        assert_eq!(load_preferences(&store).unwrap(), prefs);

        clear_preferences(&store).unwrap();
        assert_eq!(load_preferences(&store).unwrap(), Preferences::default());
    }

    #[test]
    fn test_unreadable_preferences_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set("wtw_prefs_v1", "not json").unwrap();
        assert_eq!(load_preferences(&store).unwrap(), Preferences::default());
    }

    #[test]
    fn test_toggle_saves_then_removes() {
        let store = MemoryStore::new();

        let outcome =
            toggle_saved(&store, 27205, MediaKind::Movie, "Inception", Some(2010), None).unwrap();
        assert!(outcome.saved);
        assert!(is_saved(&store, 27205, MediaKind::Movie).unwrap());

        // Same id under a different kind is a different item
        assert!(!is_saved(&store, 27205, MediaKind::Series).unwrap());

        let outcome =
            toggle_saved(&store, 27205, MediaKind::Movie, "Inception", Some(2010), None).unwrap();
        assert!(!outcome.saved);
        assert_eq!(outcome.item.title, "Inception");
        assert!(saved_items(&store).unwrap().is_empty());
    }

    #[test]
    fn test_newest_saved_item_comes_first() {
        let store = MemoryStore::new();
        toggle_saved(&store, 1, MediaKind::Movie, "First", None, None).unwrap();
        toggle_saved(&store, 2, MediaKind::Movie, "Second", None, None).unwrap();

        let items = saved_items(&store).unwrap();
        assert_eq!(items[0].title, "Second");
        assert_eq!(items[1].title, "First");
    }

    #[test]
    fn test_saved_list_is_capped() {
        let store = MemoryStore::new();
        let full: Vec<SavedItem> = (0..MAX_SAVED as u64)
            .map(|i| item(i, MediaKind::Movie, &format!("Title {i}")))
            .collect();
        store
            .set("wtw:saved", &serde_json::to_string(&full).unwrap())
            .unwrap();

        toggle_saved(&store, 9999, MediaKind::Movie, "Newest", None, None).unwrap();
        let items = saved_items(&store).unwrap();
        assert_eq!(items.len(), MAX_SAVED);
        assert_eq!(items[0].id, 9999);
    }

    #[test]
    fn test_remove_saved_returns_the_item() {
        let store = MemoryStore::new();
        toggle_saved(&store, 1, MediaKind::Series, "Show", None, None).unwrap();

        let removed = remove_saved(&store, 1, MediaKind::Series).unwrap();
        assert_eq!(removed.unwrap().title, "Show");
        assert!(remove_saved(&store, 1, MediaKind::Series).unwrap().is_none());
    }

    #[test]
    fn test_history_dedupes_case_insensitively_and_caps() {
        let store = MemoryStore::new();
        push_history(&store, "Inception", Some((27205, MediaKind::Movie))).unwrap();
        push_history(&store, "Tenet", None).unwrap();
        push_history(&store, "INCEPTION", Some((27205, MediaKind::Movie))).unwrap();

        let entries = recent_searches(&store).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].query, "INCEPTION");
        assert_eq!(entries[0].id, Some(27205));
        assert_eq!(entries[1].query, "Tenet");

        for i in 0..40 {
            push_history(&store, &format!("query {i}"), None).unwrap();
        }
        assert_eq!(recent_searches(&store).unwrap().len(), MAX_HISTORY);

        clear_history(&store).unwrap();
        assert!(recent_searches(&store).unwrap().is_empty());
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = MemoryStore::new();
        toggle_saved(&source, 1, MediaKind::Movie, "One", Some(2001), None).unwrap();
        toggle_saved(&source, 2, MediaKind::Series, "Two", None, None).unwrap();

        let doc = export_saved(&source).unwrap();
        assert_eq!(doc.version, "1.0");
        let json = serde_json::to_string_pretty(&doc).unwrap();

        let target = MemoryStore::new();
        let added = import_saved(&target, &json).unwrap();
        assert_eq!(added, 2);

        let source_keys: BTreeSet<(u64, MediaKind)> = saved_items(&source)
            .unwrap()
            .iter()
            .map(|s| (s.id, s.kind))
            .collect();
        let target_keys: BTreeSet<(u64, MediaKind)> = saved_items(&target)
            .unwrap()
            .iter()
            .map(|s| (s.id, s.kind))
            .collect();
        assert_eq!(source_keys, target_keys);
    }

    #[test]
    fn test_import_skips_items_already_present() {
        let store = MemoryStore::new();
        toggle_saved(&store, 1, MediaKind::Movie, "One", None, None).unwrap();

        let doc = BackupDocument {
            version: "1.0".to_string(),
            exported: "2026-01-01T00:00:00Z".to_string(),
            items: vec![
                item(1, MediaKind::Movie, "One"),
                item(2, MediaKind::Movie, "Two"),
            ],
        };
        let added = import_saved(&store, &serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(added, 1);

        let items = saved_items(&store).unwrap();
        assert_eq!(items.len(), 2);
        // Imported items are appended after existing ones
        assert_eq!(items[0].id, 1);
        assert_eq!(items[1].id, 2);
    }

    #[test]
    fn test_import_rejects_malformed_documents() {
        let store = MemoryStore::new();

        let err = import_saved(&store, "{").unwrap_err();
        assert!(matches!(err, SavedError::InvalidBackup(_)));

        let err = import_saved(&store, "{\"version\":\"1.0\"}").unwrap_err();
        assert!(matches!(err, SavedError::InvalidBackup(_)));

        let err = import_saved(&store, "{\"items\": 42}").unwrap_err();
        assert!(matches!(err, SavedError::InvalidBackup(_)));

        assert!(saved_items(&store).unwrap().is_empty());
    }
}
