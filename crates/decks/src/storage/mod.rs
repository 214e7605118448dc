//! Storage traits and implementations
//!
//! All state shared between sync routines lives behind the [`DeckStore`]
//! repository trait: per-service deck marks, captured credentials and sync
//! bookkeeping. Tests use the in-memory store; the CLI uses SQLite.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryDeckStore;
pub use sqlite::SqliteDeckStore;
pub use traits::DeckStore;
