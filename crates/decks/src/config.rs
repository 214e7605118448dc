//! Settings and tuning for deck sync
//!
//! Two files in the KeySync config directory:
//! 1. `settings.json` - user-facing toggles ([`Settings`])
//! 2. `keysync.json` - endpoints and pacing ([`SyncConfig`]), optional
//!
//! Endpoint URLs can also be overridden with `KEYSYNC_VAULT_URL`,
//! `KEYSYNC_DOK_URL` and `KEYSYNC_CRUCIBLE_URL`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Service;

/// Settings filename in the config directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Tuning filename in the config directory
pub const SYNC_CONFIG_FILE: &str = "keysync.json";

/// Deck database filename in the config directory
pub const DATABASE_FILE: &str = "decks.sqlite";

/// User toggles, kept apart from deck and token data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Import Master Vault decks into Decks of KeyForge
    pub sync_dok: bool,
    /// Import Master Vault decks into The Crucible Online
    pub sync_tco: bool,
    /// Run a sync at most once a day from `keysync auto`
    pub auto_sync_daily: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync_dok: true,
            sync_tco: true,
            auto_sync_daily: false,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing
    pub fn load() -> Result<Self> {
        config::load_json_or_default(SETTINGS_FILE)
    }

    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }

    /// Whether sync into `service` is switched on
    pub fn is_enabled(&self, service: Service) -> bool {
        match service {
            Service::MasterVault => true,
            Service::DecksOfKeyforge => self.sync_dok,
            Service::Crucible => self.sync_tco,
        }
    }

    /// Enabled target services, in report order
    pub fn enabled_targets(&self) -> Vec<Service> {
        Service::targets()
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }
}

/// Request pacing for one import target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetPacing {
    /// Pause between two decks, whatever the outcome
    pub request_delay_ms: u64,
    /// Pause after the target says "slow down"
    pub rate_limit_cooldown_ms: u64,
    /// Consecutive rate-limit answers for one deck before giving up the batch
    pub max_rate_limit_retries: u32,
}

impl TargetPacing {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    /// No pauses at all
    pub fn immediate() -> Self {
        Self {
            request_delay_ms: 0,
            rate_limit_cooldown_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for TargetPacing {
    fn default() -> Self {
        Self {
            request_delay_ms: 3_000,
            rate_limit_cooldown_ms: 60_000,
            max_rate_limit_retries: 10,
        }
    }
}

/// Endpoints and pacing for the three services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub vault_url: String,
    pub dok_url: String,
    pub crucible_url: String,
    /// Decks per Master Vault listing page
    pub page_size: u32,
    /// HTTP timeout for any single request
    pub request_timeout_secs: u64,
    pub dok: TargetPacing,
    pub crucible: TargetPacing,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            vault_url: "https://www.keyforgegame.com".to_string(),
            dok_url: "https://decksofkeyforge.com".to_string(),
            crucible_url: "https://thecrucible.online".to_string(),
            page_size: 10,
            request_timeout_secs: 30,
            dok: TargetPacing::default(),
            crucible: TargetPacing {
                request_delay_ms: 5_000,
                ..TargetPacing::default()
            },
        }
    }
}

impl SyncConfig {
    /// Load `keysync.json` if present, then apply env overrides
    pub fn load() -> Result<Self> {
        let mut config: SyncConfig = config::load_json_or_default(SYNC_CONFIG_FILE)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SyncConfig =
            serde_json::from_str(json).context("Failed to parse sync config JSON")?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        let overrides = [
            ("KEYSYNC_VAULT_URL", &mut self.vault_url),
            ("KEYSYNC_DOK_URL", &mut self.dok_url),
            ("KEYSYNC_CRUCIBLE_URL", &mut self.crucible_url),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var)
                && !value.trim().is_empty()
            {
                *slot = value.trim().to_string();
            }
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.page_size >= 1, "page_size must be at least 1");
        anyhow::ensure!(
            self.request_timeout_secs >= 1,
            "request_timeout_secs must be at least 1"
        );
        for (name, raw) in [
            ("vault_url", &self.vault_url),
            ("dok_url", &self.dok_url),
            ("crucible_url", &self.crucible_url),
        ] {
            url::Url::parse(raw).with_context(|| format!("Invalid {}: {}", name, raw))?;
        }
        Ok(())
    }

    /// Pacing for an import target
    pub fn pacing(&self, service: Service) -> &TargetPacing {
        match service {
            Service::Crucible => &self.crucible,
            _ => &self.dok,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
