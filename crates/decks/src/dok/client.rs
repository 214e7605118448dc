//! Decks of KeyForge HTTP client

use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;
use ureq::Agent;

use super::api::ImportResponse;
use crate::auth::require_token;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::http::{agent, endpoint, is_auth_failure};
use crate::models::{DeckId, Service};
use crate::storage::DeckStore;
use crate::sync::{ImportOutcome, ImportRules, ImportTarget};

/// Known Decks of KeyForge failure messages
pub const DOK_RULES: ImportRules = ImportRules {
    already_imported: &["already imported", "already added", "already in"],
    unimportable: &["not found", "unsupported", "cannot be imported", "can't be imported"],
    rate_limited: &["too many", "rate limit", "slow down"],
};

const BODY_PREVIEW_CHARS: usize = 200;

/// Decks of KeyForge API client
pub struct DokClient {
    store: Arc<dyn DeckStore>,
    agent: Agent,
    base_url: String,
}

impl DokClient {
    pub fn new(store: Arc<dyn DeckStore>, config: &SyncConfig) -> Self {
        Self {
            store,
            agent: agent(config.request_timeout()),
            base_url: config.dok_url.clone(),
        }
    }
}

impl ImportTarget for DokClient {
    fn service(&self) -> Service {
        Service::DecksOfKeyforge
    }

    fn import_deck(&self, deck_id: &DeckId) -> Result<ImportOutcome> {
        let token = require_token(self.store.as_ref(), Service::DecksOfKeyforge)?;
        let url = endpoint(
            &self.base_url,
            &format!(
                "/api/decks/{}/import-and-add",
                urlencoding::encode(deck_id.as_str())
            ),
        )?;

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Authorization", &token)
            .header("Accept", "application/json")
            .send_empty()
            .context("Failed to send import request")?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read import response")?;
        debug!("[dok] {} -> {} {}", deck_id, status, preview(&body));

        classify_response(status, &body)
    }
}

/// Map an import answer's status and body to an outcome
///
/// 429 asks for a cooldown, 401/403 means the token is gone, any other
/// non-2xx halts with a preview of the body.
pub fn classify_response(status: u16, body: &str) -> Result<ImportOutcome> {
    if status == 429 {
        return Ok(ImportOutcome::RateLimited);
    }
    if is_auth_failure(status) {
        return Err(SyncError::LoginRequired {
            service: Service::DecksOfKeyforge,
        }
        .into());
    }
    if !(200..300).contains(&status) {
        return Ok(ImportOutcome::Failed(format!(
            "HTTP {}: {}",
            status,
            preview(body)
        )));
    }
    Ok(classify_import_response(body))
}

/// Classify a 2xx import body
///
/// A bare `false` is the service declining the deck; it carries no reason and
/// retrying it would give the same answer.
pub fn classify_import_response(body: &str) -> ImportOutcome {
    match serde_json::from_str::<ImportResponse>(body) {
        Ok(ImportResponse::Flag(true)) => ImportOutcome::Imported,
        Ok(ImportResponse::Flag(false)) => {
            ImportOutcome::Unimportable("Decks of KeyForge declined the deck".to_string())
        }
        Ok(ImportResponse::Detailed { success, message }) => {
            DOK_RULES.classify(success, message.as_deref())
        }
        Err(_) => ImportOutcome::Failed(format!("Unexpected response: {}", preview(body))),
    }
}

fn preview(body: &str) -> String {
    body.trim().chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_login_required;
    use crate::storage::InMemoryDeckStore;

    #[test]
    fn test_bare_flags() {
        assert_eq!(classify_import_response("true"), ImportOutcome::Imported);
        assert!(matches!(
            classify_import_response(" false\n"),
            ImportOutcome::Unimportable(_)
        ));
    }

    #[test]
    fn test_detailed_messages() {
        assert_eq!(
            classify_import_response(r#"{"success": false, "message": "Deck already imported"}"#),
            ImportOutcome::AlreadyImported
        );
        assert_eq!(
            classify_import_response(r#"{"success": false, "message": "Too Many Requests"}"#),
            ImportOutcome::RateLimited
        );
        assert_eq!(
            classify_import_response(r#"{"success": false, "message": "Deck not found"}"#),
            ImportOutcome::Unimportable("Deck not found".to_string())
        );
        assert_eq!(
            classify_import_response(r#"{"success": true}"#),
            ImportOutcome::Imported
        );
    }

    #[test]
    fn test_unknown_message_fails() {
        assert_eq!(
            classify_import_response(r#"{"success": false, "message": "database on fire"}"#),
            ImportOutcome::Failed("database on fire".to_string())
        );
    }

    #[test]
    fn test_garbage_body_fails() {
        assert!(matches!(
            classify_import_response("<html>oops</html>"),
            ImportOutcome::Failed(msg) if msg.contains("<html>")
        ));
    }

    #[test]
    fn test_too_many_requests_is_rate_limited() {
        assert_eq!(
            classify_response(429, "slow down").unwrap(),
            ImportOutcome::RateLimited
        );
    }

    #[test]
    fn test_rejected_token_is_login_required() {
        for status in [401, 403] {
            let err = classify_response(status, "").unwrap_err();
            assert!(is_login_required(&err), "status {}", status);
        }
    }

    #[test]
    fn test_server_error_fails_with_body_preview() {
        let long_body = "x".repeat(500);
        match classify_response(500, &long_body).unwrap() {
            ImportOutcome::Failed(message) => {
                assert!(message.starts_with("HTTP 500: xxx"));
                assert_eq!(message.len(), "HTTP 500: ".len() + BODY_PREVIEW_CHARS);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_success_status_classifies_body() {
        assert_eq!(classify_response(200, "true").unwrap(), ImportOutcome::Imported);
        assert_eq!(
            classify_response(201, r#"{"success": false, "message": "already imported"}"#)
                .unwrap(),
            ImportOutcome::AlreadyImported
        );
    }

    #[test]
    fn test_missing_token_is_login_required() {
        let store: Arc<dyn DeckStore> = Arc::new(InMemoryDeckStore::new());
        let config = SyncConfig {
            dok_url: "http://127.0.0.1:9".to_string(),
            ..SyncConfig::default()
        };
        let client = DokClient::new(store, &config);

        let err = client.import_deck(&DeckId::new("d1")).unwrap_err();
        assert!(is_login_required(&err));
    }
}
