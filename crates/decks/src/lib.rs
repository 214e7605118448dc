//! Decks crate - Business logic for KeyForge deck synchronization
//!
//! This crate mirrors the decks a user owns in the Master Vault into
//! Decks of KeyForge and The Crucible Online:
//! - Domain models (DeckId, SyncMark, OwnershipMap, Service)
//! - Passive credential capture for each service
//! - Master Vault, Decks of KeyForge and Crucible API clients
//! - Storage trait abstractions (in-memory and SQLite)
//! - Idempotent, rate-limited sync engine with progress events
//!
//! This crate has zero UI dependencies; hosts receive progress through an
//! [`EventSink`].

pub mod auth;
pub mod config;
pub mod crucible;
pub mod dok;
pub mod error;
pub mod events;
mod http;
pub mod models;
pub mod storage;
pub mod sync;
pub mod vault;

pub use auth::{SiteSnapshot, TokenCapture, capture_and_relay, capture_for, open_login_page, relay_token};
pub use config::{Settings, SyncConfig, TargetPacing};
pub use crucible::CrucibleClient;
pub use dok::DokClient;
pub use error::{SyncError, find_sync_error, is_login_required};
pub use events::{ChannelSink, EventSink, LogSink, MemorySink, NullSink, SyncEvent};
pub use models::{Credential, DeckId, DeckRecord, OwnershipMap, Service, SyncMark, SyncState};
pub use storage::{DeckStore, InMemoryDeckStore, SqliteDeckStore};
pub use sync::{
    // Sync execution
    ImportOutcome, ImportStats, ImportTarget, InventoryStats, SyncReport, SyncService,
    TargetResult, compute_delta, fetch_inventory, run_import,
    // Source abstraction
    DeckPage, DeckSource, VaultUser,
    // Sync timing
    Sleeper, ThreadSleeper, cooldown_elapsed, should_auto_sync,
};
pub use vault::VaultClient;
