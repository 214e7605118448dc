//! Typed sync failures
//!
//! Library functions return `anyhow::Result`; these types are attached to the
//! error chain so callers can `downcast_ref` and decide how to report them.

use crate::models::{DeckId, Service};

/// Classified failures of a sync routine
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No token captured for the service, or the service rejected it
    #[error("Not logged in to {}", .service.display_name())]
    LoginRequired { service: Service },

    /// A listing or user-info call returned a non-2xx status
    #[error("{} returned HTTP {status} for {what}", .service.display_name())]
    Http {
        service: Service,
        status: u16,
        what: String,
    },

    /// An import failed in an unrecognized way; the rest of the batch was skipped
    #[error("{} import of deck {deck_id} failed: {message}", .service.display_name())]
    ImportHalted {
        service: Service,
        deck_id: DeckId,
        message: String,
    },

    /// The target kept rate-limiting the same deck
    #[error("{} rate-limited deck {deck_id} {attempts} times in a row", .service.display_name())]
    RateLimitStalled {
        service: Service,
        deck_id: DeckId,
        attempts: u32,
    },
}

impl SyncError {
    pub fn service(&self) -> Service {
        match self {
            SyncError::LoginRequired { service }
            | SyncError::Http { service, .. }
            | SyncError::ImportHalted { service, .. }
            | SyncError::RateLimitStalled { service, .. } => *service,
        }
    }
}

/// Find a [`SyncError`] anywhere in an error chain
pub fn find_sync_error(err: &anyhow::Error) -> Option<&SyncError> {
    err.downcast_ref::<SyncError>()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<SyncError>()))
}

/// Whether the error means the user has to log in again
pub fn is_login_required(err: &anyhow::Error) -> bool {
    matches!(find_sync_error(err), Some(SyncError::LoginRequired { .. }))
}
