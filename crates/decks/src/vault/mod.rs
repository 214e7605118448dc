//! Master Vault integration (source of deck ownership)
//!
//! This module provides:
//! - Master Vault API client implementing [`DeckSource`](crate::sync::DeckSource)
//! - Response types for the user and deck-list endpoints

mod client;

pub use client::VaultClient;

/// Master Vault API response types
pub mod api {
    use serde::Deserialize;

    /// Response from `GET /api/users/self/`
    #[derive(Debug, Deserialize)]
    pub struct UserResponse {
        pub data: UserData,
    }

    #[derive(Debug, Deserialize)]
    pub struct UserData {
        pub id: String,
        pub username: Option<String>,
    }

    /// Response from listing a user's decks
    #[derive(Debug, Deserialize)]
    pub struct DeckListResponse {
        /// Total decks owned, across all pages
        pub count: usize,
        #[serde(default)]
        pub data: Vec<DeckSummary>,
    }

    /// A deck entry in a listing page
    #[derive(Debug, Deserialize)]
    pub struct DeckSummary {
        pub id: String,
        #[serde(default)]
        pub name: Option<String>,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_deck_list() {
            let json = r#"{
                "count": 2,
                "data": [
                    {"id": "3e0e0e0e-1111-2222-3333-444455556666", "name": "Quixotic Archivist", "expansion": 341},
                    {"id": "7a7a7a7a-1111-2222-3333-444455556666"}
                ],
                "_linked": {}
            }"#;

            let list: DeckListResponse = serde_json::from_str(json).unwrap();
            assert_eq!(list.count, 2);
            assert_eq!(list.data.len(), 2);
            assert_eq!(list.data[0].name.as_deref(), Some("Quixotic Archivist"));
            assert!(list.data[1].name.is_none());
        }

        #[test]
        fn test_parse_empty_deck_list() {
            let list: DeckListResponse = serde_json::from_str(r#"{"count": 0}"#).unwrap();
            assert_eq!(list.count, 0);
            assert!(list.data.is_empty());
        }

        #[test]
        fn test_parse_user() {
            let json = r#"{"data": {"id": "u-1", "username": "archon", "email": "a@b.c"}}"#;
            let user: UserResponse = serde_json::from_str(json).unwrap();
            assert_eq!(user.data.id, "u-1");
            assert_eq!(user.data.username.as_deref(), Some("archon"));
        }
    }
}
