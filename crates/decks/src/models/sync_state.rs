//! Per-service sync bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Service;

/// Tracks the last settled sync of one service
///
/// Only one SyncState per service. Written after a routine finishes so the
/// daily auto-sync can tell how long ago the last full pass ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub service: Service,
    /// When the last sync of this service completed
    pub last_sync_at: DateTime<Utc>,
    /// Total deck count the service reported (source service only)
    #[serde(default)]
    pub last_total: Option<usize>,
    /// Decks settled in this service's namespace after the sync
    #[serde(default)]
    pub settled: usize,
}

impl SyncState {
    pub fn new(service: Service, settled: usize) -> Self {
        Self {
            service,
            last_sync_at: Utc::now(),
            last_total: None,
            settled,
        }
    }

    /// Record the server-reported total
    pub fn with_total(mut self, total: usize) -> Self {
        self.last_total = Some(total);
        self
    }

    /// Whether the local set matched the server total when last synced
    pub fn is_complete(&self) -> bool {
        self.last_total.is_none_or(|total| self.settled >= total)
    }
}
