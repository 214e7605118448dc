//! Passive token capture from a service's own pages
//!
//! Each service keeps its session somewhere different, so each gets its own
//! adapter. A change in one site's storage layout only touches one adapter.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::models::{CrucibleRefreshToken, Service};

/// A cookie as seen by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
}

/// What a content script can observe on a site: cookies and page-local storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSnapshot {
    #[serde(default)]
    pub cookies: Vec<SiteCookie>,
    #[serde(default)]
    pub local_storage: HashMap<String, String>,
}

impl SiteSnapshot {
    /// Load a snapshot exported as JSON
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
            .with_context(|| format!("Failed to load site snapshot from {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse site snapshot JSON")
    }

    /// Find a cookie by name whose domain is `domain` or a subdomain of it
    pub fn cookie(&self, name: &str, domain: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name && domain_matches(&c.domain, domain))
            .map(|c| c.value.as_str())
    }

    pub fn local(&self, key: &str) -> Option<&str> {
        self.local_storage.get(key).map(String::as_str)
    }
}

fn domain_matches(cookie_domain: &str, domain: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.');
    cookie_domain == domain || cookie_domain.ends_with(&format!(".{}", domain))
}

/// Reads one service's token out of a site snapshot
pub trait TokenCapture {
    fn service(&self) -> Service;

    /// The token, if the snapshot shows a logged-in session
    fn capture(&self, snapshot: &SiteSnapshot) -> Option<String>;
}

/// Master Vault: the `auth` session cookie
#[derive(Debug, Default, Clone, Copy)]
pub struct VaultCookieCapture;

impl VaultCookieCapture {
    const COOKIE: &'static str = "auth";
    const DOMAIN: &'static str = "keyforgegame.com";
}

impl TokenCapture for VaultCookieCapture {
    fn service(&self) -> Service {
        Service::MasterVault
    }

    fn capture(&self, snapshot: &SiteSnapshot) -> Option<String> {
        snapshot
            .cookie(Self::COOKIE, Self::DOMAIN)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Decks of KeyForge: the `AUTH` local-storage entry
#[derive(Debug, Default, Clone, Copy)]
pub struct DokStorageCapture;

impl DokStorageCapture {
    const KEY: &'static str = "AUTH";
}

impl TokenCapture for DokStorageCapture {
    fn service(&self) -> Service {
        Service::DecksOfKeyforge
    }

    fn capture(&self, snapshot: &SiteSnapshot) -> Option<String> {
        snapshot
            .local(Self::KEY)
            .map(|v| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// The Crucible Online: the `refreshToken` JSON blob in local storage
#[derive(Debug, Default, Clone, Copy)]
pub struct CrucibleStorageCapture;

impl CrucibleStorageCapture {
    const KEY: &'static str = "refreshToken";
}

impl TokenCapture for CrucibleStorageCapture {
    fn service(&self) -> Service {
        Service::Crucible
    }

    fn capture(&self, snapshot: &SiteSnapshot) -> Option<String> {
        let raw = snapshot.local(Self::KEY)?;
        CrucibleRefreshToken::parse(raw).ok()?;
        Some(raw.to_string())
    }
}

/// The capture adapter for a service
pub fn capture_for(service: Service) -> Box<dyn TokenCapture> {
    match service {
        Service::MasterVault => Box::new(VaultCookieCapture),
        Service::DecksOfKeyforge => Box::new(DokStorageCapture),
        Service::Crucible => Box::new(CrucibleStorageCapture),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(json: &str) -> SiteSnapshot {
        SiteSnapshot::from_json(json).unwrap()
    }

    #[test]
    fn test_vault_cookie_on_subdomain() {
        let snap = snapshot(
            r#"{"cookies": [
                {"name": "auth", "value": "vault-token", "domain": ".www.keyforgegame.com"},
                {"name": "auth", "value": "other", "domain": "example.com"}
            ]}"#,
        );
        assert_eq!(VaultCookieCapture.capture(&snap).as_deref(), Some("vault-token"));
    }

    #[test]
    fn test_vault_cookie_wrong_domain_is_ignored() {
        let snap = snapshot(
            r#"{"cookies": [{"name": "auth", "value": "x", "domain": "notkeyforgegame.com"}]}"#,
        );
        assert!(VaultCookieCapture.capture(&snap).is_none());
    }

    #[test]
    fn test_dok_local_storage() {
        let snap = snapshot(r#"{"localStorage": {"AUTH": "\"dok-token\""}}"#);
        assert_eq!(DokStorageCapture.capture(&snap).as_deref(), Some("dok-token"));

        let logged_out = snapshot(r#"{"localStorage": {"AUTH": ""}}"#);
        assert!(DokStorageCapture.capture(&logged_out).is_none());
    }

    #[test]
    fn test_crucible_refresh_token_must_parse() {
        let snap = snapshot(
            r#"{"localStorage": {"refreshToken": "{\"id\":7,\"token\":\"refresh\"}"}}"#,
        );
        let captured = CrucibleStorageCapture.capture(&snap).unwrap();
        assert_eq!(CrucibleRefreshToken::parse(&captured).unwrap().token, "refresh");

        let garbage = snapshot(r#"{"localStorage": {"refreshToken": "oops"}}"#);
        assert!(CrucibleStorageCapture.capture(&garbage).is_none());
    }

    #[test]
    fn test_snapshot_ignores_unknown_fields() {
        let snap = snapshot(
            r#"{"origin": "https://decksofkeyforge.com", "localStorage": {"AUTH": "t"}}"#,
        );
        assert!(snap.cookies.is_empty());
        assert_eq!(snap.local("AUTH"), Some("t"));
    }

    #[test]
    fn test_capture_for_matches_service() {
        for service in Service::ALL {
            assert_eq!(capture_for(service).service(), service);
        }
    }
}
