//! Deck identity and per-service sync marks

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a deck (Master Vault deck id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckId(pub String);

impl DeckId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeckId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeckId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sync state of one deck in one service's namespace
///
/// Persisted as `false`, `true` or the literal `"import error"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncMark {
    #[default]
    NotSynced,
    Synced,
    /// The target rejected this deck as unimportable; never retried
    ImportError,
}

impl SyncMark {
    /// Text form of the error sentinel
    pub const IMPORT_ERROR: &'static str = "import error";

    /// Whether the deck needs no further attempts for this service
    pub fn is_settled(self) -> bool {
        matches!(self, SyncMark::Synced | SyncMark::ImportError)
    }

    /// Combine an existing mark with a new one.
    ///
    /// Marks only move forward: a settled mark never reverts to `NotSynced`,
    /// so interleaved writers can lose updates without losing progress.
    pub fn merge(existing: Option<SyncMark>, new: SyncMark) -> SyncMark {
        match (existing, new) {
            (Some(old), SyncMark::NotSynced) if old.is_settled() => old,
            _ => new,
        }
    }

    /// Storage text for this mark
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMark::NotSynced => "false",
            SyncMark::Synced => "true",
            SyncMark::ImportError => Self::IMPORT_ERROR,
        }
    }

    /// Parse the storage text written by [`SyncMark::as_str`]
    pub fn parse(s: &str) -> Option<SyncMark> {
        match s {
            "false" => Some(SyncMark::NotSynced),
            "true" => Some(SyncMark::Synced),
            Self::IMPORT_ERROR => Some(SyncMark::ImportError),
            _ => None,
        }
    }
}

impl Serialize for SyncMark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SyncMark::NotSynced => serializer.serialize_bool(false),
            SyncMark::Synced => serializer.serialize_bool(true),
            SyncMark::ImportError => serializer.serialize_str(Self::IMPORT_ERROR),
        }
    }
}

impl<'de> Deserialize<'de> for SyncMark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(SyncMark::Synced),
            Raw::Flag(false) => Ok(SyncMark::NotSynced),
            Raw::Text(text) if text == Self::IMPORT_ERROR => Ok(SyncMark::ImportError),
            Raw::Text(text) => Err(serde::de::Error::custom(format!(
                "unexpected sync mark '{}'",
                text
            ))),
        }
    }
}

/// Insertion-ordered deck marks for one service
///
/// Iteration follows the order decks were first recorded, which is the
/// order imports are attempted in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnershipMap {
    order: Vec<DeckId>,
    marks: HashMap<DeckId, SyncMark>,
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mark, keeping the first-seen position of existing decks
    pub fn insert(&mut self, id: DeckId, mark: SyncMark) {
        let merged = SyncMark::merge(self.marks.get(&id).copied(), mark);
        if self.marks.insert(id.clone(), merged).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &DeckId) -> Option<SyncMark> {
        self.marks.get(id).copied()
    }

    /// Whether the deck has a settled mark in this map
    pub fn is_settled(&self, id: &DeckId) -> bool {
        self.get(id).is_some_and(SyncMark::is_settled)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of decks with a settled mark
    pub fn settled_count(&self) -> usize {
        self.marks.values().filter(|m| m.is_settled()).count()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&DeckId, SyncMark)> {
        self.order.iter().map(|id| (id, self.marks[id]))
    }
}

impl FromIterator<(DeckId, SyncMark)> for OwnershipMap {
    fn from_iter<I: IntoIterator<Item = (DeckId, SyncMark)>>(iter: I) -> Self {
        let mut map = OwnershipMap::new();
        for (id, mark) in iter {
            map.insert(id, mark);
        }
        map
    }
}

/// One deck's marks across all services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckRecord {
    pub id: DeckId,
    #[serde(default)]
    pub mv: SyncMark,
    #[serde(default)]
    pub dok: SyncMark,
    #[serde(default)]
    pub tco: SyncMark,
}

impl DeckRecord {
    pub fn new(id: DeckId) -> Self {
        Self {
            id,
            mv: SyncMark::NotSynced,
            dok: SyncMark::NotSynced,
            tco: SyncMark::NotSynced,
        }
    }

    pub fn mark(&self, service: super::Service) -> SyncMark {
        match service {
            super::Service::MasterVault => self.mv,
            super::Service::DecksOfKeyforge => self.dok,
            super::Service::Crucible => self.tco,
        }
    }

    pub fn set_mark(&mut self, service: super::Service, mark: SyncMark) {
        let slot = match service {
            super::Service::MasterVault => &mut self.mv,
            super::Service::DecksOfKeyforge => &mut self.dok,
            super::Service::Crucible => &mut self.tco,
        };
        *slot = SyncMark::merge(Some(*slot), mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Service;

    #[test]
    fn test_mark_serialization() {
        assert_eq!(serde_json::to_string(&SyncMark::Synced).unwrap(), "true");
        assert_eq!(serde_json::to_string(&SyncMark::NotSynced).unwrap(), "false");
        assert_eq!(
            serde_json::to_string(&SyncMark::ImportError).unwrap(),
            "\"import error\""
        );
        let mark: SyncMark = serde_json::from_str("\"import error\"").unwrap();
        assert_eq!(mark, SyncMark::ImportError);
        assert!(serde_json::from_str::<SyncMark>("\"maybe\"").is_err());
    }

    #[test]
    fn test_merge_never_reverts_settled() {
        assert_eq!(
            SyncMark::merge(Some(SyncMark::Synced), SyncMark::NotSynced),
            SyncMark::Synced
        );
        assert_eq!(
            SyncMark::merge(Some(SyncMark::ImportError), SyncMark::NotSynced),
            SyncMark::ImportError
        );
        assert_eq!(
            SyncMark::merge(Some(SyncMark::NotSynced), SyncMark::Synced),
            SyncMark::Synced
        );
        assert_eq!(SyncMark::merge(None, SyncMark::NotSynced), SyncMark::NotSynced);
    }

    #[test]
    fn test_ownership_map_keeps_first_seen_order() {
        let mut map = OwnershipMap::new();
        map.insert(DeckId::new("b"), SyncMark::Synced);
        map.insert(DeckId::new("a"), SyncMark::Synced);
        map.insert(DeckId::new("b"), SyncMark::Synced);

        let ids: Vec<&str> = map.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_deck_record_json_shape() {
        let mut record = DeckRecord::new(DeckId::new("d1"));
        record.set_mark(Service::MasterVault, SyncMark::Synced);
        record.set_mark(Service::Crucible, SyncMark::ImportError);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "d1", "mv": true, "dok": false, "tco": "import error"})
        );
    }
}
