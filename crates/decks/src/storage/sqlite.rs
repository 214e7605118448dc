//! SQLite-based deck storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use rusqlite_migration::{M, Migrations};

use super::traits::DeckStore;
use crate::models::{Credential, DeckId, DeckRecord, OwnershipMap, Service, SyncMark, SyncState};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Every deck id ever seen, in first-seen order
            CREATE TABLE decks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                first_seen_at TEXT NOT NULL
            );

            -- One mark per deck per service namespace
            CREATE TABLE deck_marks (
                service TEXT NOT NULL,
                deck_id TEXT NOT NULL,
                mark TEXT NOT NULL CHECK (mark IN ('true', 'false', 'import error')),
                seq INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (service, deck_id),
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_deck_marks_order ON deck_marks(service, seq ASC);

            -- Captured tokens
            CREATE TABLE credentials (
                service TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                captured_at TEXT NOT NULL
            );
            "#,
        ),
        // Migration 2: Per-service sync bookkeeping
        M::up(
            r#"
            CREATE TABLE sync_state (
                service TEXT PRIMARY KEY,
                last_sync_at TEXT NOT NULL,
                last_total INTEGER,
                settled INTEGER NOT NULL DEFAULT 0
            );
            "#,
        ),
    ])
}

/// SQLite-based deck storage
pub struct SqliteDeckStore {
    conn: Mutex<Connection>,
}

impl SqliteDeckStore {
    /// Open (or create) a deck database at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL keeps readers (status) unblocked while a sync writes.
        // foreign_keys is required for ON DELETE CASCADE.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Merge one mark inside an open transaction
    fn write_mark(
        tx: &Transaction<'_>,
        service: Service,
        deck_id: &DeckId,
        mark: SyncMark,
        now: &str,
    ) -> Result<()> {
        tx.execute(
            "INSERT OR IGNORE INTO decks (id, first_seen_at) VALUES (?, ?)",
            params![deck_id.as_str(), now],
        )?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT mark FROM deck_marks WHERE service = ? AND deck_id = ?",
                params![service.key(), deck_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let existing = existing.as_deref().and_then(SyncMark::parse);
        let merged = SyncMark::merge(existing, mark);

        if existing.is_some() {
            tx.execute(
                "UPDATE deck_marks SET mark = ?, updated_at = ? WHERE service = ? AND deck_id = ?",
                params![merged.as_str(), now, service.key(), deck_id.as_str()],
            )?;
        } else {
            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM deck_marks WHERE service = ?",
                [service.key()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO deck_marks (service, deck_id, mark, seq, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![service.key(), deck_id.as_str(), merged.as_str(), seq, now],
            )?;
        }

        Ok(())
    }

    fn parse_time(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

impl DeckStore for SqliteDeckStore {
    fn mark(&self, service: Service, deck_id: &DeckId, mark: SyncMark) -> Result<()> {
        self.mark_many(service, std::slice::from_ref(deck_id), mark)
    }

    fn mark_many(&self, service: Service, deck_ids: &[DeckId], mark: SyncMark) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for deck_id in deck_ids {
            Self::write_mark(&tx, service, deck_id, mark, &now)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_mark(&self, service: Service, deck_id: &DeckId) -> Result<Option<SyncMark>> {
        let conn = self.conn.lock().unwrap();

        let mark: Option<String> = conn
            .query_row(
                "SELECT mark FROM deck_marks WHERE service = ? AND deck_id = ?",
                params![service.key(), deck_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(mark.as_deref().and_then(SyncMark::parse))
    }

    fn ownership(&self, service: Service) -> Result<OwnershipMap> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT deck_id, mark FROM deck_marks WHERE service = ? ORDER BY seq ASC",
        )?;

        let rows = stmt
            .query_map([service.key()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, mark)| SyncMark::parse(&mark).map(|m| (DeckId::new(id), m)))
            .collect())
    }

    fn count_settled(&self, service: Service) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM deck_marks WHERE service = ? AND mark != 'false'",
            [service.key()],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn list_decks(&self) -> Result<Vec<DeckRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT d.id, m.service, m.mark
             FROM decks d LEFT JOIN deck_marks m ON m.deck_id = d.id
             ORDER BY d.seq ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records: Vec<DeckRecord> = Vec::new();
        for (id, service, mark) in rows {
            if records.last().is_none_or(|r| r.id.as_str() != id) {
                records.push(DeckRecord::new(DeckId::new(id)));
            }
            let (Some(service), Some(mark)) = (service, mark) else {
                continue;
            };
            if let (Ok(service), Some(mark)) = (service.parse::<Service>(), SyncMark::parse(&mark))
                && let Some(record) = records.last_mut()
            {
                record.set_mark(service, mark);
            }
        }

        Ok(records)
    }

    fn get_credential(&self, service: Service) -> Result<Option<Credential>> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT token, captured_at FROM credentials WHERE service = ?",
                [service.key()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(token, captured_at)| Credential {
            service,
            token,
            captured_at: Self::parse_time(&captured_at),
        }))
    }

    fn save_credential(&self, credential: Credential) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO credentials (service, token, captured_at) VALUES (?, ?, ?)",
            params![
                credential.service.key(),
                credential.token,
                credential.captured_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn delete_credential(&self, service: Service) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM credentials WHERE service = ?", [service.key()])?;
        Ok(())
    }

    fn get_sync_state(&self, service: Service) -> Result<Option<SyncState>> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, Option<i64>, i64)> = conn
            .query_row(
                "SELECT last_sync_at, last_total, settled FROM sync_state WHERE service = ?",
                [service.key()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(last_sync_at, last_total, settled)| SyncState {
            service,
            last_sync_at: Self::parse_time(&last_sync_at),
            last_total: last_total.map(|t| t as usize),
            settled: settled as usize,
        }))
    }

    fn save_sync_state(&self, state: SyncState) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO sync_state (service, last_sync_at, last_total, settled)
             VALUES (?, ?, ?, ?)",
            params![
                state.service.key(),
                state.last_sync_at.to_rfc3339(),
                state.last_total.map(|t| t as i64),
                state.settled as i64,
            ],
        )?;

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "DELETE FROM deck_marks;
             DELETE FROM decks;
             DELETE FROM credentials;
             DELETE FROM sync_state;",
        )?;

        Ok(())
    }
}
