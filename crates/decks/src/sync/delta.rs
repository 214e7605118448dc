//! Which decks a target still needs

use crate::models::{DeckId, OwnershipMap};

/// Decks settled in `source` but not settled in `target`, in source order.
///
/// A deck the target already rejected (`ImportError`) counts as settled and
/// is never returned again.
pub fn compute_delta(source: &OwnershipMap, target: &OwnershipMap) -> Vec<DeckId> {
    source
        .iter()
        .filter(|(id, mark)| mark.is_settled() && !target.is_settled(id))
        .map(|(id, _)| id.clone())
        .collect()
}
