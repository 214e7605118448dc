//! Sync engine: inventory, delta, import and orchestration
//!
//! Every step is idempotent: re-running a sync only requests what the store
//! doesn't already mark as settled.

mod delta;
mod guard;
mod import;
mod inventory;
mod orchestrator;
mod status;
mod timing;

pub use delta::compute_delta;
pub use guard::{ActiveSync, SyncGuard};
pub use import::{ImportOutcome, ImportRules, ImportStats, ImportTarget, run_import};
pub use inventory::{DeckPage, DeckSource, InventoryStats, VaultUser, fetch_inventory};
pub use orchestrator::{SyncReport, SyncService, TargetResult};
pub use status::status_text;
pub use timing::{DAILY_SYNC_SECS, Sleeper, ThreadSleeper, cooldown_elapsed, should_auto_sync};
