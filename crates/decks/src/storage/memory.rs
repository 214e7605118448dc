//! In-memory storage implementation
//!
//! Used by tests and by callers that don't need progress to survive a
//! restart.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use super::DeckStore;
use crate::models::{Credential, DeckId, DeckRecord, OwnershipMap, Service, SyncMark, SyncState};

/// In-memory implementation of DeckStore
///
/// One insertion-ordered map per service, protected by RwLocks.
pub struct InMemoryDeckStore {
    marks: RwLock<HashMap<Service, OwnershipMap>>,
    /// First-seen order across all services
    seen: RwLock<Vec<DeckId>>,
    credentials: RwLock<HashMap<Service, Credential>>,
    sync_states: RwLock<HashMap<Service, SyncState>>,
}

impl InMemoryDeckStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            marks: RwLock::new(HashMap::new()),
            seen: RwLock::new(Vec::new()),
            credentials: RwLock::new(HashMap::new()),
            sync_states: RwLock::new(HashMap::new()),
        }
    }

    fn record(
        &self,
        marks: &mut HashMap<Service, OwnershipMap>,
        service: Service,
        deck_id: &DeckId,
        mark: SyncMark,
    ) {
        let known = Service::ALL
            .iter()
            .any(|s| marks.get(s).is_some_and(|m| m.get(deck_id).is_some()));
        if !known {
            self.seen.write().unwrap().push(deck_id.clone());
        }
        marks
            .entry(service)
            .or_default()
            .insert(deck_id.clone(), mark);
    }
}

impl Default for InMemoryDeckStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckStore for InMemoryDeckStore {
    fn mark(&self, service: Service, deck_id: &DeckId, mark: SyncMark) -> Result<()> {
        let mut marks = self.marks.write().unwrap();
        self.record(&mut marks, service, deck_id, mark);
        Ok(())
    }

    fn mark_many(&self, service: Service, deck_ids: &[DeckId], mark: SyncMark) -> Result<()> {
        let mut marks = self.marks.write().unwrap();
        for deck_id in deck_ids {
            self.record(&mut marks, service, deck_id, mark);
        }
        Ok(())
    }

    fn get_mark(&self, service: Service, deck_id: &DeckId) -> Result<Option<SyncMark>> {
        let marks = self.marks.read().unwrap();
        Ok(marks.get(&service).and_then(|m| m.get(deck_id)))
    }

    fn ownership(&self, service: Service) -> Result<OwnershipMap> {
        let marks = self.marks.read().unwrap();
        Ok(marks.get(&service).cloned().unwrap_or_default())
    }

    fn count_settled(&self, service: Service) -> Result<usize> {
        let marks = self.marks.read().unwrap();
        Ok(marks.get(&service).map_or(0, OwnershipMap::settled_count))
    }

    fn list_decks(&self) -> Result<Vec<DeckRecord>> {
        let marks = self.marks.read().unwrap();
        let seen = self.seen.read().unwrap();

        let records = seen
            .iter()
            .map(|id| {
                let mut record = DeckRecord::new(id.clone());
                for service in Service::ALL {
                    if let Some(mark) = marks.get(&service).and_then(|m| m.get(id)) {
                        record.set_mark(service, mark);
                    }
                }
                record
            })
            .collect();

        Ok(records)
    }

    fn get_credential(&self, service: Service) -> Result<Option<Credential>> {
        let credentials = self.credentials.read().unwrap();
        Ok(credentials.get(&service).cloned())
    }

    fn save_credential(&self, credential: Credential) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap();
        credentials.insert(credential.service, credential);
        Ok(())
    }

    fn delete_credential(&self, service: Service) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap();
        credentials.remove(&service);
        Ok(())
    }

    fn get_sync_state(&self, service: Service) -> Result<Option<SyncState>> {
        let states = self.sync_states.read().unwrap();
        Ok(states.get(&service).cloned())
    }

    fn save_sync_state(&self, state: SyncState) -> Result<()> {
        let mut states = self.sync_states.write().unwrap();
        states.insert(state.service, state);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.marks.write().unwrap().clear();
        self.seen.write().unwrap().clear();
        self.credentials.write().unwrap().clear();
        self.sync_states.write().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<DeckId> {
        raw.iter().map(|s| DeckId::new(*s)).collect()
    }

    #[test]
    fn test_mark_and_get() {
        let store = InMemoryDeckStore::new();
        let deck = DeckId::new("d1");

        store.mark(Service::MasterVault, &deck, SyncMark::Synced).unwrap();

        assert_eq!(
            store.get_mark(Service::MasterVault, &deck).unwrap(),
            Some(SyncMark::Synced)
        );
        assert_eq!(store.get_mark(Service::Crucible, &deck).unwrap(), None);
    }

    #[test]
    fn test_marks_are_monotonic() {
        let store = InMemoryDeckStore::new();
        let deck = DeckId::new("d1");

        store.mark(Service::Crucible, &deck, SyncMark::ImportError).unwrap();
        store.mark(Service::Crucible, &deck, SyncMark::NotSynced).unwrap();

        assert_eq!(
            store.get_mark(Service::Crucible, &deck).unwrap(),
            Some(SyncMark::ImportError)
        );
    }

    #[test]
    fn test_pending_for_uses_source_order() {
        let store = InMemoryDeckStore::new();
        store
            .mark_many(Service::MasterVault, &ids(&["a", "b", "c"]), SyncMark::Synced)
            .unwrap();
        store
            .mark(Service::DecksOfKeyforge, &DeckId::new("b"), SyncMark::Synced)
            .unwrap();

        assert_eq!(
            store.pending_for(Service::DecksOfKeyforge).unwrap(),
            ids(&["a", "c"])
        );
        assert_eq!(store.pending_for(Service::Crucible).unwrap(), ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_list_decks_merges_services() {
        let store = InMemoryDeckStore::new();
        store.mark(Service::Crucible, &DeckId::new("x"), SyncMark::Synced).unwrap();
        store.mark(Service::MasterVault, &DeckId::new("y"), SyncMark::Synced).unwrap();
        store.mark(Service::MasterVault, &DeckId::new("x"), SyncMark::Synced).unwrap();

        let decks = store.list_decks().unwrap();
        assert_eq!(decks.len(), 2);
        assert_eq!(decks[0].id.as_str(), "x");
        assert_eq!(decks[0].mv, SyncMark::Synced);
        assert_eq!(decks[0].tco, SyncMark::Synced);
        assert_eq!(decks[1].dok, SyncMark::NotSynced);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = InMemoryDeckStore::new();
        store.mark(Service::MasterVault, &DeckId::new("d1"), SyncMark::Synced).unwrap();
        store
            .save_credential(Credential::new(Service::MasterVault, "tok"))
            .unwrap();
        store.save_sync_state(SyncState::new(Service::MasterVault, 1)).unwrap();

        store.clear().unwrap();

        assert_eq!(store.count_settled(Service::MasterVault).unwrap(), 0);
        assert!(store.get_credential(Service::MasterVault).unwrap().is_none());
        assert!(store.get_sync_state(Service::MasterVault).unwrap().is_none());
        assert!(store.list_decks().unwrap().is_empty());
    }
}
