//! Sync timing: cooldowns and injectable pauses
//!
//! Pure functions that can be tested without a clock, plus the [`Sleeper`]
//! seam so import pacing can be observed in tests instead of waited out.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::Settings;

/// Seconds between two automatic daily syncs
pub const DAILY_SYNC_SECS: u64 = 24 * 60 * 60;

/// Check if enough time has elapsed since the last sync to allow a new sync.
///
/// # Arguments
/// * `last_sync_at` - When the last successful sync completed (None if never synced)
/// * `cooldown_secs` - Minimum seconds that must elapse between syncs
pub fn cooldown_elapsed(last_sync_at: Option<DateTime<Utc>>, cooldown_secs: u64) -> bool {
    match last_sync_at {
        Some(last) => {
            let elapsed = Utc::now() - last;
            elapsed.num_seconds() >= cooldown_secs as i64
        }
        None => true,
    }
}

/// Whether the daily auto-sync should run now
pub fn should_auto_sync(settings: &Settings, last_sync_at: Option<DateTime<Utc>>) -> bool {
    settings.auto_sync_daily && cooldown_elapsed(last_sync_at, DAILY_SYNC_SECS)
}

/// Blocks the current routine for a while
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
