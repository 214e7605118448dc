//! Master Vault inventory sync
//!
//! Pages through the user's vault (newest first) and marks every deck as
//! owned. Each page is persisted before the next is requested, so an
//! interrupted run keeps everything it already saw.

use anyhow::{Context, Result};
use log::{info, warn};

use super::status::status_text;
use crate::events::{EventSink, SyncEvent};
use crate::models::{DeckId, Service, SyncMark, SyncState};
use crate::storage::DeckStore;

/// The logged-in Master Vault user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultUser {
    pub id: String,
    pub username: Option<String>,
}

/// One page of the user's deck list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeckPage {
    /// Total decks the service says the user owns
    pub count: usize,
    pub deck_ids: Vec<DeckId>,
}

/// Source of deck ownership
pub trait DeckSource: Send + Sync {
    /// Resolve the logged-in user
    fn current_user(&self) -> Result<VaultUser>;

    /// Fetch one page (1-based) of the user's decks, newest first
    fn list_decks(&self, user: &VaultUser, page: u32, page_size: u32) -> Result<DeckPage>;
}

/// Statistics from an inventory sync
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InventoryStats {
    /// Number of listing pages requested
    pub pages_fetched: u32,
    /// Deck ids returned across all pages
    pub decks_listed: usize,
    /// Total the service reported on the last page
    pub total: usize,
    /// Decks marked owned locally after the sync
    pub owned: usize,
    /// Whether the local count reached the service total
    pub complete: bool,
}

/// Sync Master Vault ownership into the store
///
/// Stops when the local owned count equals the service total, or when a
/// page comes back short (a count mismatch is tolerated). Any failed page
/// aborts the run; pages already merged stay merged.
pub fn fetch_inventory(
    source: &dyn DeckSource,
    store: &dyn DeckStore,
    events: &dyn EventSink,
    page_size: u32,
) -> Result<InventoryStats> {
    let page_size = page_size.max(1);
    let mut stats = InventoryStats::default();

    let user = source.current_user().context("No Master Vault user found")?;
    info!(
        "Fetching Master Vault decks for {}",
        user.username.as_deref().unwrap_or(&user.id)
    );

    let mut page = 1;
    loop {
        let result = source
            .list_decks(&user, page, page_size)
            .with_context(|| format!("Failed to fetch Master Vault deck page {}", page))?;
        stats.pages_fetched += 1;
        stats.decks_listed += result.deck_ids.len();
        stats.total = result.count;

        store.mark_many(Service::MasterVault, &result.deck_ids, SyncMark::Synced)?;
        stats.owned = store.count_settled(Service::MasterVault)?;

        events.emit(SyncEvent::SyncProgress {
            service: Service::MasterVault,
            status: status_text(page as usize - 1).to_string(),
            processed: stats.owned,
            total: result.count,
        });

        if stats.owned == result.count {
            stats.complete = true;
            break;
        }

        if result.deck_ids.len() < page_size as usize {
            warn!(
                "Master Vault listing ended at page {} with {} of {} decks recorded",
                page, stats.owned, result.count
            );
            break;
        }

        page += 1;
    }

    store.save_sync_state(SyncState::new(Service::MasterVault, stats.owned).with_total(stats.total))?;

    info!(
        "Master Vault inventory: {} decks owned ({} pages)",
        stats.owned, stats.pages_fetched
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::storage::InMemoryDeckStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Simulated vault holding `total` decks named d0..d{total-1}
    struct PagedVault {
        total: usize,
        calls: AtomicU32,
        fail_on_page: Option<u32>,
    }

    impl PagedVault {
        fn new(total: usize) -> Self {
            Self {
                total,
                calls: AtomicU32::new(0),
                fail_on_page: None,
            }
        }
    }

    impl DeckSource for PagedVault {
        fn current_user(&self) -> Result<VaultUser> {
            Ok(VaultUser {
                id: "u1".to_string(),
                username: Some("archon".to_string()),
            })
        }

        fn list_decks(&self, _user: &VaultUser, page: u32, page_size: u32) -> Result<DeckPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_page == Some(page) {
                anyhow::bail!("HTTP 500");
            }
            let start = (page as usize - 1) * page_size as usize;
            let end = (start + page_size as usize).min(self.total);
            let deck_ids = (start.min(end)..end).map(|i| DeckId::new(format!("d{}", i))).collect();
            Ok(DeckPage {
                count: self.total,
                deck_ids,
            })
        }
    }

    #[test]
    fn test_requests_ceil_pages() {
        for (total, page_size, expected_pages) in [(25, 10, 3), (20, 10, 2), (1, 10, 1), (7, 1, 7)] {
            let vault = PagedVault::new(total);
            let store = InMemoryDeckStore::new();

            let stats = fetch_inventory(&vault, &store, &NullSink, page_size).unwrap();

            assert_eq!(vault.calls.load(Ordering::SeqCst), expected_pages);
            assert_eq!(stats.owned, total);
            assert!(stats.complete);
            assert_eq!(store.count_settled(Service::MasterVault).unwrap(), total);
        }
    }

    #[test]
    fn test_empty_vault_needs_one_request() {
        let vault = PagedVault::new(0);
        let store = InMemoryDeckStore::new();

        let stats = fetch_inventory(&vault, &store, &NullSink, 10).unwrap();

        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.owned, 0);
        assert!(stats.complete);
    }

    #[test]
    fn test_failed_page_keeps_earlier_pages() {
        let mut vault = PagedVault::new(30);
        vault.fail_on_page = Some(2);
        let store = InMemoryDeckStore::new();

        assert!(fetch_inventory(&vault, &store, &NullSink, 10).is_err());
        assert_eq!(store.count_settled(Service::MasterVault).unwrap(), 10);
        assert!(store.get_sync_state(Service::MasterVault).unwrap().is_none());
    }

    #[test]
    fn test_short_page_stops_on_count_mismatch() {
        // Local store knows a deck the vault no longer lists
        let vault = PagedVault::new(5);
        let store = InMemoryDeckStore::new();
        store
            .mark(Service::MasterVault, &DeckId::new("gone"), SyncMark::Synced)
            .unwrap();

        let stats = fetch_inventory(&vault, &store, &NullSink, 10).unwrap();

        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.owned, 6);
        assert!(!stats.complete);
    }

    #[test]
    fn test_records_sync_state() {
        let vault = PagedVault::new(12);
        let store = InMemoryDeckStore::new();

        fetch_inventory(&vault, &store, &NullSink, 10).unwrap();

        let state = store.get_sync_state(Service::MasterVault).unwrap().unwrap();
        assert_eq!(state.last_total, Some(12));
        assert_eq!(state.settled, 12);
    }
}
