//! Decks of KeyForge integration (import target)

mod client;

pub use client::{DOK_RULES, DokClient, classify_import_response, classify_response};

/// Decks of KeyForge API response types
pub mod api {
    use serde::Deserialize;

    /// Body of `POST /api/decks/{id}/import-and-add`
    ///
    /// The endpoint answers with a bare boolean; error paths may carry a
    /// message object instead.
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(untagged)]
    pub enum ImportResponse {
        Flag(bool),
        Detailed {
            success: bool,
            #[serde(default)]
            message: Option<String>,
        },
    }
}
