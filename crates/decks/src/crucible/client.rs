//! The Crucible Online HTTP client

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ureq::Agent;

use super::api::{DeckListResponse, ImportRequest, ImportResponse, TokenRequest, TokenResponse};
use crate::auth::require_token;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::http::{agent, endpoint, is_auth_failure, require_success};
use crate::models::{CrucibleRefreshToken, DeckId, Service};
use crate::storage::DeckStore;
use crate::sync::{ImportOutcome, ImportRules, ImportTarget};

/// Known Crucible failure messages
pub const CRUCIBLE_RULES: ImportRules = ImportRules {
    already_imported: &["already exists", "already imported"],
    unimportable: &[
        "not supported",
        "future expansion",
        "invalid deck",
        "deck not found",
    ],
    rate_limited: &["too many", "rate limit"],
};

/// Safety bound on existing-deck pagination
const MAX_LIST_PAGES: u32 = 1000;

const BODY_PREVIEW_CHARS: usize = 200;

/// Why existing-deck pagination stopped, if it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStop {
    /// Collected as many decks as the server reported
    ReachedTotal,
    /// The page came back short, so it was the last one
    ShortPage,
    /// Hit `MAX_LIST_PAGES`
    PageLimit,
}

/// Decide whether pagination ends after `page`
fn page_stop(
    page: u32,
    fetched: usize,
    collected: usize,
    num_decks: Option<usize>,
    page_size: u32,
) -> Option<PageStop> {
    if num_decks.is_some_and(|total| collected >= total) {
        Some(PageStop::ReachedTotal)
    } else if fetched < page_size as usize {
        Some(PageStop::ShortPage)
    } else if page >= MAX_LIST_PAGES {
        Some(PageStop::PageLimit)
    } else {
        None
    }
}

/// The Crucible Online API client
pub struct CrucibleClient {
    store: Arc<dyn DeckStore>,
    agent: Agent,
    base_url: String,
    page_size: u32,
    /// Pause between existing-deck listing pages
    list_delay: Duration,
    bearer: Mutex<Option<String>>,
}

impl CrucibleClient {
    pub fn new(store: Arc<dyn DeckStore>, config: &SyncConfig) -> Self {
        Self {
            store,
            agent: agent(config.request_timeout()),
            base_url: config.crucible_url.clone(),
            page_size: config.page_size,
            list_delay: config.crucible.request_delay(),
            bearer: Mutex::new(None),
        }
    }

    fn login_required() -> anyhow::Error {
        SyncError::LoginRequired {
            service: Service::Crucible,
        }
        .into()
    }

    /// Exchange the stored refresh token for a bearer
    fn exchange_token(&self) -> Result<String> {
        let raw = require_token(self.store.as_ref(), Service::Crucible)?;
        let refresh = CrucibleRefreshToken::parse(&raw).map_err(|e| {
            debug!("[tco] Stored refresh token unusable: {:#}", e);
            Self::login_required()
        })?;

        let url = endpoint(&self.base_url, "/api/account/token")?;
        let response = self
            .agent
            .post(url.as_str())
            .header("Accept", "application/json")
            .send_json(TokenRequest { token: &refresh })
            .context("Failed to send token exchange request")?;
        let mut response = require_success(Service::Crucible, "token exchange", response)?;

        let exchanged: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token exchange response")?;

        match exchanged.token.filter(|t| exchanged.success && !t.is_empty()) {
            Some(token) => {
                info!("[tco] Refresh token exchanged");
                Ok(token)
            }
            None => {
                debug!(
                    "[tco] Token exchange refused: {}",
                    exchanged.message.as_deref().unwrap_or("no message")
                );
                Err(Self::login_required())
            }
        }
    }

    /// The bearer for this run, exchanging on first use
    fn bearer(&self) -> Result<String> {
        if let Some(token) = self.bearer.lock().unwrap().clone() {
            return Ok(token);
        }
        let token = self.exchange_token()?;
        *self.bearer.lock().unwrap() = Some(token.clone());
        Ok(token)
    }

    fn list_page(&self, bearer: &str, page: u32) -> Result<DeckListResponse> {
        let mut url = endpoint(&self.base_url, "/api/decks")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &self.page_size.to_string());

        let response = self
            .agent
            .get(url.as_str())
            .header("Authorization", &format!("Bearer {}", bearer))
            .header("Accept", "application/json")
            .call()
            .context("Failed to send deck list request")?;
        let mut response = require_success(Service::Crucible, "deck list", response)?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse deck list response")
    }
}

impl ImportTarget for CrucibleClient {
    fn service(&self) -> Service {
        Service::Crucible
    }

    /// Always exchange afresh: a bearer cached from an earlier run may be stale
    fn prepare(&self) -> Result<()> {
        let token = self.exchange_token()?;
        *self.bearer.lock().unwrap() = Some(token);
        Ok(())
    }

    fn existing_decks(&self) -> Result<Vec<DeckId>> {
        let bearer = self.bearer()?;
        let mut decks = Vec::new();

        let mut page = 1;
        loop {
            let list = self.list_page(&bearer, page)?;
            if !list.success {
                anyhow::bail!(
                    "Crucible refused deck list: {}",
                    list.message.as_deref().unwrap_or("no message")
                );
            }

            let fetched = list.decks.len();
            decks.extend(list.decks.into_iter().filter_map(|d| d.uuid).map(DeckId::new));

            match page_stop(page, fetched, decks.len(), list.num_decks, self.page_size) {
                Some(PageStop::PageLimit) => {
                    warn!(
                        "[tco] Stopped listing existing decks after {} pages ({} found)",
                        page,
                        decks.len()
                    );
                    break;
                }
                Some(_) => break,
                None => {}
            }

            page += 1;
            std::thread::sleep(self.list_delay);
        }

        debug!("[tco] Account holds {} decks", decks.len());
        Ok(decks)
    }

    fn import_deck(&self, deck_id: &DeckId) -> Result<ImportOutcome> {
        let bearer = self.bearer()?;
        let url = endpoint(&self.base_url, "/api/decks")?;

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", bearer))
            .header("Accept", "application/json")
            .send_json(ImportRequest {
                uuid: deck_id.as_str(),
            })
            .context("Failed to send import request")?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read import response")?;
        debug!("[tco] {} -> {} {}", deck_id, status, preview(&body));

        classify_response(status, &body)
    }
}

/// Map an import answer's status and body to an outcome
///
/// 429 asks for a cooldown and 401/403 means the bearer was rejected;
/// everything else is classified by its body.
fn classify_response(status: u16, body: &str) -> Result<ImportOutcome> {
    if status == 429 {
        return Ok(ImportOutcome::RateLimited);
    }
    if is_auth_failure(status) {
        return Err(CrucibleClient::login_required());
    }
    Ok(classify_import_response(status, body))
}

/// Classify an import body
///
/// Error statuses often still carry a `{success, message}` body, so the
/// message is classified whenever it parses.
fn classify_import_response(status: u16, body: &str) -> ImportOutcome {
    match serde_json::from_str::<ImportResponse>(body) {
        Ok(parsed) => {
            let success = parsed.success && (200..300).contains(&status);
            CRUCIBLE_RULES.classify(success, parsed.message.as_deref())
        }
        Err(_) if (200..300).contains(&status) => {
            ImportOutcome::Failed(format!("Unexpected response: {}", preview(body)))
        }
        Err(_) => ImportOutcome::Failed(format!("HTTP {}: {}", status, preview(body))),
    }
}

fn preview(body: &str) -> String {
    body.trim().chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_login_required;
    use crate::models::Credential;
    use crate::storage::InMemoryDeckStore;

    fn client(store: Arc<dyn DeckStore>) -> CrucibleClient {
        let config = SyncConfig {
            crucible_url: "http://127.0.0.1:9".to_string(),
            ..SyncConfig::default()
        };
        CrucibleClient::new(store, &config)
    }

    #[test]
    fn test_classify_success() {
        assert_eq!(
            classify_import_response(200, r#"{"success": true}"#),
            ImportOutcome::Imported
        );
    }

    #[test]
    fn test_classify_known_messages() {
        assert_eq!(
            classify_import_response(200, r#"{"success": false, "message": "Deck already exists."}"#),
            ImportOutcome::AlreadyImported
        );
        assert!(matches!(
            classify_import_response(
                400,
                r#"{"success": false, "message": "This deck is from a future expansion and not currently supported"}"#
            ),
            ImportOutcome::Unimportable(_)
        ));
        assert_eq!(
            classify_import_response(200, r#"{"success": false, "message": "Too many requests"}"#),
            ImportOutcome::RateLimited
        );
    }

    #[test]
    fn test_classify_error_status_without_body() {
        assert_eq!(
            classify_response(500, "Internal Server Error").unwrap(),
            ImportOutcome::Failed("HTTP 500: Internal Server Error".to_string())
        );
    }

    #[test]
    fn test_too_many_requests_is_rate_limited() {
        assert_eq!(
            classify_response(429, "").unwrap(),
            ImportOutcome::RateLimited
        );
    }

    #[test]
    fn test_rejected_bearer_is_login_required() {
        for status in [401, 403] {
            let err = classify_response(status, r#"{"success": false}"#).unwrap_err();
            assert!(is_login_required(&err), "status {}", status);
        }
    }

    #[test]
    fn test_error_status_with_message_is_classified() {
        assert_eq!(
            classify_response(400, r#"{"success": false, "message": "Deck already exists"}"#)
                .unwrap(),
            ImportOutcome::AlreadyImported
        );
    }

    #[test]
    fn test_page_stop_at_reported_total() {
        // Full page, but the server said there are only 20 decks
        assert_eq!(page_stop(2, 10, 20, Some(20), 10), Some(PageStop::ReachedTotal));
    }

    #[test]
    fn test_page_stop_on_short_page() {
        assert_eq!(page_stop(3, 4, 24, None, 10), Some(PageStop::ShortPage));
        assert_eq!(page_stop(1, 0, 0, Some(5), 10), Some(PageStop::ShortPage));
    }

    #[test]
    fn test_page_stop_continues_on_full_page() {
        assert_eq!(page_stop(1, 10, 10, Some(25), 10), None);
        assert_eq!(page_stop(1, 10, 10, None, 10), None);
    }

    #[test]
    fn test_page_stop_at_page_limit() {
        assert_eq!(page_stop(MAX_LIST_PAGES - 1, 10, 9990, None, 10), None);
        assert_eq!(
            page_stop(MAX_LIST_PAGES, 10, 10_000, None, 10),
            Some(PageStop::PageLimit)
        );
    }

    #[test]
    fn test_success_flag_on_error_status_is_not_imported() {
        assert!(matches!(
            classify_import_response(502, r#"{"success": true}"#),
            ImportOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_prepare_without_capture_is_login_required() {
        let store: Arc<dyn DeckStore> = Arc::new(InMemoryDeckStore::new());
        let err = client(store).prepare().unwrap_err();
        assert!(is_login_required(&err));
    }

    #[test]
    fn test_malformed_refresh_token_is_login_required() {
        let store: Arc<dyn DeckStore> = Arc::new(InMemoryDeckStore::new());
        store
            .save_credential(Credential::new(Service::Crucible, "not json"))
            .unwrap();
        let err = client(store).prepare().unwrap_err();
        assert!(is_login_required(&err));
    }
}
