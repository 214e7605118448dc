//! Import driver for target services
//!
//! Decks are imported one at a time, strictly in delta order, with a pause
//! between requests. Every outcome except "rate limited" settles the deck.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use super::status::status_text;
use super::timing::Sleeper;
use crate::config::TargetPacing;
use crate::error::{SyncError, is_login_required};
use crate::events::{EventSink, SyncEvent};
use crate::models::{DeckId, Service, SyncMark, SyncState};
use crate::storage::DeckStore;

/// What a target said about one import request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The deck was added
    Imported,
    /// The target already had it
    AlreadyImported,
    /// A known "this deck can't be imported" answer
    Unimportable(String),
    /// Slow down and try the same deck again
    RateLimited,
    /// Anything unrecognized
    Failed(String),
}

/// Message fragments used to classify failed imports
///
/// Matching is case-insensitive substring matching against the target's
/// free-text error message.
#[derive(Debug, Clone, Copy)]
pub struct ImportRules {
    pub already_imported: &'static [&'static str],
    pub unimportable: &'static [&'static str],
    pub rate_limited: &'static [&'static str],
}

impl ImportRules {
    /// Classify a `{ success, message }` style answer
    pub fn classify(&self, success: bool, message: Option<&str>) -> ImportOutcome {
        if success {
            return ImportOutcome::Imported;
        }

        let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) else {
            return ImportOutcome::Failed("import failed without a message".to_string());
        };
        let lowered = message.to_lowercase();
        let mentions = |needles: &[&str]| needles.iter().any(|n| lowered.contains(&n.to_lowercase()));

        if mentions(self.already_imported) {
            ImportOutcome::AlreadyImported
        } else if mentions(self.rate_limited) {
            ImportOutcome::RateLimited
        } else if mentions(self.unimportable) {
            ImportOutcome::Unimportable(message.to_string())
        } else {
            ImportOutcome::Failed(message.to_string())
        }
    }
}

/// A service decks can be imported into
pub trait ImportTarget: Send + Sync {
    fn service(&self) -> Service;

    /// Per-run setup such as exchanging a refresh token
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Decks the target already holds, used to pre-seed its namespace
    fn existing_decks(&self) -> Result<Vec<DeckId>> {
        Ok(Vec::new())
    }

    /// Ask the target to import one deck
    fn import_deck(&self, deck_id: &DeckId) -> Result<ImportOutcome>;
}

/// Statistics from an import run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    /// Decks found in the target before importing
    pub preseeded: usize,
    /// Decks in the delta when the run started
    pub candidates: usize,
    pub imported: usize,
    pub already_imported: usize,
    pub unimportable: usize,
    /// Rate-limit answers received (each one retried)
    pub rate_limited: usize,
}

impl ImportStats {
    /// Decks settled by this run
    pub fn processed(&self) -> usize {
        self.imported + self.already_imported + self.unimportable
    }
}

/// Import every pending Master Vault deck into `target`
///
/// Stops the whole batch on an unrecognized failure, and after
/// `max_rate_limit_retries` consecutive rate-limit answers for one deck.
pub fn run_import(
    target: &dyn ImportTarget,
    store: &dyn DeckStore,
    events: &dyn EventSink,
    sleeper: &dyn Sleeper,
    pacing: &TargetPacing,
) -> Result<ImportStats> {
    let service = target.service();
    let mut stats = ImportStats::default();

    target
        .prepare()
        .with_context(|| format!("Failed to prepare {} import", service.display_name()))?;

    let existing = target
        .existing_decks()
        .with_context(|| format!("Failed to list {} decks", service.display_name()))?;
    if !existing.is_empty() {
        store.mark_many(service, &existing, SyncMark::Synced)?;
        stats.preseeded = existing.len();
        debug!("[{}] {} decks already present", service, existing.len());
    }

    let delta = store.pending_for(service)?;
    stats.candidates = delta.len();
    if delta.is_empty() {
        info!("[{}] Nothing to import", service);
        store.save_sync_state(SyncState::new(service, store.count_settled(service)?))?;
        return Ok(stats);
    }
    info!("[{}] Importing {} decks", service, delta.len());

    for (index, deck_id) in delta.iter().enumerate() {
        let mut attempts: u32 = 0;
        loop {
            let outcome = match target.import_deck(deck_id) {
                Ok(outcome) => outcome,
                Err(e) if is_login_required(&e) => return Err(e),
                Err(e) => {
                    error!("[{}] Import of {} failed: {:#}", service, deck_id, e);
                    emit_halted(events, service, index, delta.len());
                    return Err(e.context(SyncError::ImportHalted {
                        service,
                        deck_id: deck_id.clone(),
                        message: "request failed".to_string(),
                    }));
                }
            };

            match outcome {
                ImportOutcome::Imported => {
                    store.mark(service, deck_id, SyncMark::Synced)?;
                    stats.imported += 1;
                }
                ImportOutcome::AlreadyImported => {
                    store.mark(service, deck_id, SyncMark::Synced)?;
                    stats.already_imported += 1;
                }
                ImportOutcome::Unimportable(reason) => {
                    warn!("[{}] Deck {} can't be imported: {}", service, deck_id, reason);
                    store.mark(service, deck_id, SyncMark::ImportError)?;
                    stats.unimportable += 1;
                }
                ImportOutcome::RateLimited => {
                    attempts += 1;
                    stats.rate_limited += 1;
                    if attempts > pacing.max_rate_limit_retries {
                        return Err(SyncError::RateLimitStalled {
                            service,
                            deck_id: deck_id.clone(),
                            attempts,
                        }
                        .into());
                    }
                    warn!(
                        "[{}] Rate limited on {}, cooling down for {:?}",
                        service,
                        deck_id,
                        pacing.rate_limit_cooldown()
                    );
                    events.emit(SyncEvent::SyncProgress {
                        service,
                        status: "Rate limited, cooling down".to_string(),
                        processed: index,
                        total: delta.len(),
                    });
                    sleeper.sleep(pacing.rate_limit_cooldown());
                    continue;
                }
                ImportOutcome::Failed(message) => {
                    error!("[{}] Import of {} failed: {}", service, deck_id, message);
                    emit_halted(events, service, index, delta.len());
                    return Err(SyncError::ImportHalted {
                        service,
                        deck_id: deck_id.clone(),
                        message,
                    }
                    .into());
                }
            }
            break;
        }

        events.emit(SyncEvent::SyncProgress {
            service,
            status: status_text(index).to_string(),
            processed: index + 1,
            total: delta.len(),
        });

        if index + 1 < delta.len() {
            sleeper.sleep(pacing.request_delay());
        }
    }

    store.save_sync_state(SyncState::new(service, store.count_settled(service)?))?;
    info!(
        "[{}] Imported {}, already present {}, unimportable {}",
        service, stats.imported, stats.already_imported, stats.unimportable
    );
    Ok(stats)
}

/// Report the deck that stopped the batch as processed
fn emit_halted(events: &dyn EventSink, service: Service, index: usize, total: usize) {
    events.emit(SyncEvent::SyncProgress {
        service,
        status: "Import halted".to_string(),
        processed: index + 1,
        total,
    });
}
