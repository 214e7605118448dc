//! The three deck services KeySync talks to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A deck service
///
/// The Master Vault is the source of truth for ownership; the other two are
/// sync targets that get updated to match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Service {
    #[serde(rename = "mv")]
    MasterVault,
    #[serde(rename = "dok")]
    DecksOfKeyforge,
    #[serde(rename = "tco")]
    Crucible,
}

impl Service {
    /// All services, source first
    pub const ALL: [Service; 3] = [
        Service::MasterVault,
        Service::DecksOfKeyforge,
        Service::Crucible,
    ];

    /// Target services in the order they are reported
    pub fn targets() -> [Service; 2] {
        [Service::DecksOfKeyforge, Service::Crucible]
    }

    /// Short key used to namespace persisted state
    pub fn key(self) -> &'static str {
        match self {
            Service::MasterVault => "mv",
            Service::DecksOfKeyforge => "dok",
            Service::Crucible => "tco",
        }
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Service::MasterVault => "Master Vault",
            Service::DecksOfKeyforge => "Decks of KeyForge",
            Service::Crucible => "The Crucible Online",
        }
    }

    /// Page the user should visit to log in (and let the token be captured)
    pub fn login_url(self) -> &'static str {
        match self {
            Service::MasterVault => "https://www.keyforgegame.com/my-decks",
            Service::DecksOfKeyforge => "https://decksofkeyforge.com/my-decks",
            Service::Crucible => "https://thecrucible.online/decks",
        }
    }

    pub fn is_source(self) -> bool {
        self == Service::MasterVault
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when parsing an unknown service key
#[derive(Debug, thiserror::Error)]
#[error("Unknown service '{0}' (expected mv, dok or tco)")]
pub struct UnknownServiceError(pub String);

impl FromStr for Service {
    type Err = UnknownServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mv" | "vault" | "master-vault" => Ok(Service::MasterVault),
            "dok" | "decks-of-keyforge" => Ok(Service::DecksOfKeyforge),
            "tco" | "crucible" => Ok(Service::Crucible),
            other => Err(UnknownServiceError(other.to_string())),
        }
    }
}
