//! Credential acquisition
//!
//! No login flow lives here. Tokens are observed where each site already
//! stores them ([`capture`]) and relayed into the store once. A missing token
//! means "please log in", never an interactive prompt.

mod capture;

pub use capture::{
    CrucibleStorageCapture, DokStorageCapture, SiteCookie, SiteSnapshot, TokenCapture,
    VaultCookieCapture, capture_for,
};

use anyhow::Result;
use log::{info, warn};

use crate::error::SyncError;
use crate::events::{EventSink, SyncEvent};
use crate::models::{Credential, Service};
use crate::storage::DeckStore;

/// Persist a captured token and announce it
pub fn relay_token(
    store: &dyn DeckStore,
    events: &dyn EventSink,
    service: Service,
    token: impl Into<String>,
) -> Result<()> {
    store.save_credential(Credential::new(service, token))?;
    info!("Captured {} token", service.display_name());
    events.emit(SyncEvent::TokenCaptured { service });
    Ok(())
}

/// Run a service's capture adapter over a snapshot and relay the result.
///
/// Returns whether a token was found.
pub fn capture_and_relay(
    store: &dyn DeckStore,
    events: &dyn EventSink,
    service: Service,
    snapshot: &SiteSnapshot,
) -> Result<bool> {
    match capture_for(service).capture(snapshot) {
        Some(token) => {
            relay_token(store, events, service, token)?;
            Ok(true)
        }
        None => {
            warn!(
                "No {} session found in snapshot; log in at {}",
                service.display_name(),
                service.login_url()
            );
            Ok(false)
        }
    }
}

/// Read a service's token, or fail with `LoginRequired`
pub fn require_token(store: &dyn DeckStore, service: Service) -> Result<String> {
    store
        .get_credential(service)?
        .map(|c| c.token)
        .ok_or_else(|| SyncError::LoginRequired { service }.into())
}

/// Open the service's login page in the default browser.
///
/// Returns immediately; the token is picked up by a later capture.
pub fn open_login_page(service: Service) -> Result<()> {
    let url = service.login_url();
    if let Err(e) = open::that(url) {
        warn!("Failed to open browser: {}. Please open {} manually.", e, url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_login_required;
    use crate::events::MemorySink;
    use crate::storage::InMemoryDeckStore;

    #[test]
    fn test_require_token_without_capture() {
        let store = InMemoryDeckStore::new();
        let err = require_token(&store, Service::DecksOfKeyforge).unwrap_err();
        assert!(is_login_required(&err));
    }

    #[test]
    fn test_relay_then_require() {
        let store = InMemoryDeckStore::new();
        let sink = MemorySink::new();

        relay_token(&store, &sink, Service::DecksOfKeyforge, "tok").unwrap();

        assert_eq!(require_token(&store, Service::DecksOfKeyforge).unwrap(), "tok");
        assert_eq!(
            sink.events(),
            vec![SyncEvent::TokenCaptured {
                service: Service::DecksOfKeyforge
            }]
        );
    }

    #[test]
    fn test_capture_and_relay_logged_out() {
        let store = InMemoryDeckStore::new();
        let sink = MemorySink::new();

        let found =
            capture_and_relay(&store, &sink, Service::Crucible, &SiteSnapshot::default()).unwrap();

        assert!(!found);
        assert!(sink.events().is_empty());
        assert!(store.get_credential(Service::Crucible).unwrap().is_none());
    }
}
