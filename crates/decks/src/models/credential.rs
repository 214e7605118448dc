//! Captured service credentials

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Service;

/// A token captured for one service
///
/// For the Master Vault and Decks of KeyForge this is a bare bearer string.
/// For The Crucible Online it is the JSON refresh-token blob the site keeps
/// in its local storage (see [`CrucibleRefreshToken`]).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub service: Service,
    pub token: String,
    pub captured_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(service: Service, token: impl Into<String>) -> Self {
        Self {
            service,
            token: token.into(),
            captured_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("service", &self.service)
            .field("token", &"[REDACTED]")
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Refresh token blob stored by The Crucible Online
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CrucibleRefreshToken {
    /// Id of the refresh-token record (not the user id)
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub token: String,
}

impl CrucibleRefreshToken {
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed: Self =
            serde_json::from_str(raw).context("Crucible refresh token is not valid JSON")?;
        anyhow::ensure!(!parsed.token.is_empty(), "Crucible refresh token is empty");
        Ok(parsed)
    }
}

impl fmt::Debug for CrucibleRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrucibleRefreshToken")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
