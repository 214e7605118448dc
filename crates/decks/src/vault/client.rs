//! Master Vault HTTP client

use anyhow::{Context, Result};
use std::sync::Arc;
use ureq::Agent;

use super::api::{DeckListResponse, UserResponse};
use crate::auth::require_token;
use crate::config::SyncConfig;
use crate::http::{agent, endpoint, require_success};
use crate::models::{DeckId, Service};
use crate::storage::DeckStore;
use crate::sync::{DeckPage, DeckSource, VaultUser};

/// Master Vault API client
///
/// Authenticates with the captured `auth` session cookie, read from the
/// store on every call so a freshly captured token is picked up.
pub struct VaultClient {
    store: Arc<dyn DeckStore>,
    agent: Agent,
    base_url: String,
}

impl VaultClient {
    pub fn new(store: Arc<dyn DeckStore>, config: &SyncConfig) -> Self {
        Self {
            store,
            agent: agent(config.request_timeout()),
            base_url: config.vault_url.clone(),
        }
    }

    fn authorization(&self) -> Result<String> {
        let token = require_token(self.store.as_ref(), Service::MasterVault)?;
        Ok(format!("Token {}", token))
    }
}

impl DeckSource for VaultClient {
    fn current_user(&self) -> Result<VaultUser> {
        let authorization = self.authorization()?;
        let url = endpoint(&self.base_url, "/api/users/self/")?;

        let response = self
            .agent
            .get(url.as_str())
            .header("Authorization", &authorization)
            .header("Accept", "application/json")
            .call()
            .context("Failed to send user request")?;
        let mut response = require_success(Service::MasterVault, "user info", response)?;

        let user: UserResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse user response")?;

        Ok(VaultUser {
            id: user.data.id,
            username: user.data.username,
        })
    }

    fn list_decks(&self, user: &VaultUser, page: u32, page_size: u32) -> Result<DeckPage> {
        let authorization = self.authorization()?;
        let mut url = endpoint(
            &self.base_url,
            &format!("/api/users/{}/decks/", urlencoding::encode(&user.id)),
        )?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string())
            .append_pair("search", "")
            .append_pair("ordering", "-date");

        let response = self
            .agent
            .get(url.as_str())
            .header("Authorization", &authorization)
            .header("Accept", "application/json")
            .call()
            .context("Failed to send deck list request")?;
        let mut response = require_success(Service::MasterVault, "deck list", response)?;

        let list: DeckListResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse deck list response")?;

        Ok(DeckPage {
            count: list.count,
            deck_ids: list.data.into_iter().map(|d| DeckId::new(d.id)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_login_required;
    use crate::storage::InMemoryDeckStore;

    #[test]
    fn test_missing_cookie_is_login_required_without_network() {
        let store: Arc<dyn DeckStore> = Arc::new(InMemoryDeckStore::new());
        // Unroutable base: a network attempt would fail differently
        let config = SyncConfig {
            vault_url: "http://127.0.0.1:9".to_string(),
            ..SyncConfig::default()
        };
        let client = VaultClient::new(store, &config);

        let err = client.current_user().unwrap_err();
        assert!(is_login_required(&err));
    }
}
