//! Storage trait definitions

use crate::models::{Credential, DeckId, DeckRecord, OwnershipMap, Service, SyncMark, SyncState};
use crate::sync::compute_delta;
use anyhow::Result;

/// Trait for deck sync storage operations
///
/// The only state shared between sync routines. Implementations must apply
/// [`SyncMark::merge`] on every write so marks never move backwards.
pub trait DeckStore: Send + Sync {
    /// Record a mark for one deck in a service's namespace
    fn mark(&self, service: Service, deck_id: &DeckId, mark: SyncMark) -> Result<()>;

    /// Record the same mark for several decks in one write
    fn mark_many(&self, service: Service, deck_ids: &[DeckId], mark: SyncMark) -> Result<()>;

    /// Get a deck's mark in a service's namespace
    fn get_mark(&self, service: Service, deck_id: &DeckId) -> Result<Option<SyncMark>>;

    /// All marks for a service, in first-recorded order
    fn ownership(&self, service: Service) -> Result<OwnershipMap>;

    /// Count decks with a settled mark for a service
    fn count_settled(&self, service: Service) -> Result<usize>;

    /// Every known deck with its marks across services, in first-seen order
    fn list_decks(&self) -> Result<Vec<DeckRecord>>;

    /// Decks owned in the Master Vault that still need importing into `target`
    fn pending_for(&self, target: Service) -> Result<Vec<DeckId>> {
        let source = self.ownership(Service::MasterVault)?;
        let existing = self.ownership(target)?;
        Ok(compute_delta(&source, &existing))
    }

    /// Get the captured credential for a service
    fn get_credential(&self, service: Service) -> Result<Option<Credential>>;

    /// Save (replace) the credential for a service
    fn save_credential(&self, credential: Credential) -> Result<()>;

    /// Forget the credential for a service
    fn delete_credential(&self, service: Service) -> Result<()>;

    /// Get sync state for a service
    fn get_sync_state(&self, service: Service) -> Result<Option<SyncState>>;

    /// Save sync state (upsert)
    fn save_sync_state(&self, state: SyncState) -> Result<()>;

    /// Clear all data: marks, credentials and sync state
    fn clear(&self) -> Result<()>;
}
