//! Domain models for decks and sync state

mod credential;
mod deck;
mod service;
mod sync_state;

pub use credential::{Credential, CrucibleRefreshToken};
pub use deck::{DeckId, DeckRecord, OwnershipMap, SyncMark};
pub use service::{Service, UnknownServiceError};
pub use sync_state::SyncState;
