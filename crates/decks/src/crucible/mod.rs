//! The Crucible Online integration (import target)
//!
//! Requests are authorized with a short-lived bearer obtained by exchanging
//! the captured refresh token once per run.

mod client;

pub use client::{CRUCIBLE_RULES, CrucibleClient};

/// The Crucible Online API request and response types
pub mod api {
    use serde::{Deserialize, Serialize};

    use crate::models::CrucibleRefreshToken;

    /// Body of `POST /api/account/token`
    #[derive(Debug, Serialize)]
    pub struct TokenRequest<'a> {
        pub token: &'a CrucibleRefreshToken,
    }

    #[derive(Debug, Deserialize)]
    pub struct TokenResponse {
        #[serde(default)]
        pub success: bool,
        #[serde(default)]
        pub token: Option<String>,
        #[serde(default)]
        pub message: Option<String>,
    }

    /// Response from `GET /api/decks`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DeckListResponse {
        #[serde(default)]
        pub success: bool,
        #[serde(default)]
        pub decks: Vec<DeckEntry>,
        /// Total across pages, when the server reports it
        #[serde(default)]
        pub num_decks: Option<usize>,
        #[serde(default)]
        pub message: Option<String>,
    }

    /// A deck held by the account; `uuid` is the Master Vault deck id
    #[derive(Debug, Deserialize)]
    pub struct DeckEntry {
        #[serde(default)]
        pub uuid: Option<String>,
    }

    /// Body of `POST /api/decks`
    #[derive(Debug, Serialize)]
    pub struct ImportRequest<'a> {
        pub uuid: &'a str,
    }

    #[derive(Debug, Deserialize)]
    pub struct ImportResponse {
        #[serde(default)]
        pub success: bool,
        #[serde(default)]
        pub message: Option<String>,
    }

}
