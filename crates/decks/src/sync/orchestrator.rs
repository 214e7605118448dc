//! Sync orchestration
//!
//! Runs the Master Vault inventory first, then every enabled target on its
//! own thread. Targets settle independently: one failing does not stop the
//! other.

use anyhow::{Result, anyhow};
use log::{info, warn};
use std::sync::Arc;

use super::guard::SyncGuard;
use super::import::{ImportStats, ImportTarget, run_import};
use super::inventory::{DeckSource, InventoryStats, fetch_inventory};
use super::timing::{Sleeper, should_auto_sync};
use crate::config::{Settings, SyncConfig};
use crate::error::is_login_required;
use crate::events::{EventSink, SyncEvent};
use crate::models::Service;
use crate::storage::DeckStore;

/// How one target's routine ended
#[derive(Debug)]
pub enum TargetResult {
    Completed(ImportStats),
    /// Another sync for this service was already running
    Skipped,
    Failed(anyhow::Error),
}

impl TargetResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, TargetResult::Failed(_))
    }
}

/// Outcome of a full sync pass
#[derive(Debug)]
pub struct SyncReport {
    pub inventory: InventoryStats,
    pub targets: Vec<(Service, TargetResult)>,
}

impl SyncReport {
    /// Services whose routine failed
    pub fn failed(&self) -> Vec<Service> {
        self.targets
            .iter()
            .filter(|(_, result)| result.is_failed())
            .map(|(service, _)| *service)
            .collect()
    }
}

/// Coordinates sync routines over a shared store
pub struct SyncService {
    store: Arc<dyn DeckStore>,
    events: Arc<dyn EventSink>,
    sleeper: Arc<dyn Sleeper>,
    config: SyncConfig,
    guard: SyncGuard,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn DeckStore>,
        events: Arc<dyn EventSink>,
        sleeper: Arc<dyn Sleeper>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            events,
            sleeper,
            config,
            guard: SyncGuard::new(),
        }
    }

    pub fn guard(&self) -> &SyncGuard {
        &self.guard
    }

    /// Sync Master Vault ownership.
    ///
    /// Returns `Ok(None)` without touching the network when an inventory
    /// sync is already running.
    pub fn sync_inventory(&self, source: &dyn DeckSource) -> Result<Option<InventoryStats>> {
        let Some(_active) = self.guard.try_acquire(Service::MasterVault) else {
            info!("Master Vault sync already in progress, ignoring request");
            return Ok(None);
        };

        self.events.emit(SyncEvent::SyncStart {
            service: Service::MasterVault,
        });
        fetch_inventory(
            source,
            self.store.as_ref(),
            self.events.as_ref(),
            self.config.page_size,
        )
        .map(Some)
    }

    /// Import pending decks into one target.
    ///
    /// Returns `Ok(None)` when a sync for that target is already running.
    pub fn sync_target(&self, target: &dyn ImportTarget) -> Result<Option<ImportStats>> {
        let service = target.service();
        let Some(_active) = self.guard.try_acquire(service) else {
            info!("{} sync already in progress, ignoring request", service.display_name());
            return Ok(None);
        };

        self.events.emit(SyncEvent::SyncStart { service });
        run_import(
            target,
            self.store.as_ref(),
            self.events.as_ref(),
            self.sleeper.as_ref(),
            self.config.pacing(service),
        )
        .map(Some)
    }

    /// Run a full pass: inventory, then every enabled target concurrently.
    ///
    /// Returns `Ok(None)` if the request was discarded because a pass is
    /// already running. An inventory failure emits `sync_error` and is
    /// returned; target failures are reported per service and followed by
    /// `sync_complete`.
    pub fn sync_all(
        &self,
        source: &dyn DeckSource,
        targets: &[&dyn ImportTarget],
        settings: &Settings,
    ) -> Result<Option<SyncReport>> {
        let inventory = match self.sync_inventory(source) {
            Ok(Some(stats)) => stats,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.report_failure(Some(Service::MasterVault), &e);
                return Err(e);
            }
        };

        let enabled: Vec<&dyn ImportTarget> = targets
            .iter()
            .copied()
            .filter(|t| settings.is_enabled(t.service()))
            .collect();

        let results: Vec<(Service, TargetResult)> = std::thread::scope(|scope| {
            let handles: Vec<_> = enabled
                .iter()
                .map(|target| {
                    let service = target.service();
                    (service, scope.spawn(move || self.sync_target(*target)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(service, handle)| {
                    let result = match handle.join() {
                        Ok(Ok(Some(stats))) => TargetResult::Completed(stats),
                        Ok(Ok(None)) => TargetResult::Skipped,
                        Ok(Err(e)) => TargetResult::Failed(e),
                        Err(_) => TargetResult::Failed(anyhow!("{} sync panicked", service)),
                    };
                    (service, result)
                })
                .collect()
        });

        for (service, result) in &results {
            if let TargetResult::Failed(e) = result {
                self.report_failure(Some(*service), e);
            }
        }

        let report = SyncReport {
            inventory,
            targets: results,
        };
        self.events.emit(SyncEvent::SyncComplete {
            failed: report.failed(),
        });
        Ok(Some(report))
    }

    /// Whether the daily auto-sync is due
    pub fn auto_sync_due(&self, settings: &Settings) -> Result<bool> {
        let last = self
            .store
            .get_sync_state(Service::MasterVault)?
            .map(|s| s.last_sync_at);
        Ok(should_auto_sync(settings, last))
    }

    /// Convert a routine failure into an event
    fn report_failure(&self, service: Option<Service>, err: &anyhow::Error) {
        match service {
            Some(service) if is_login_required(err) => {
                warn!("Not logged in to {}", service.display_name());
                self.events.emit(SyncEvent::login_required(service));
            }
            _ => {
                self.events.emit(SyncEvent::SyncError {
                    service,
                    message: format!("{:#}", err),
                });
            }
        }
    }
}
