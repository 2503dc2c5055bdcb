//! SQLite persistence for ledger state and the custodian.

use crate::asset::{AssetId, AssetParseError};
use crate::ledger::{LedgerSnapshot, Position, PositionRecord};
use crate::registry::AssetRegistry;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

const SCHEMA_VERSION: &str = "1";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("asset: {0}")]
    Asset(#[from] AssetParseError),
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

pub struct LedgerStore {
    conn: Mutex<Connection>,
}

impl LedgerStore {
    /// Open or create the store at `path`. Creates parent dirs if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS assets (
                asset TEXT PRIMARY KEY,
                supported INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS positions (
                asset TEXT NOT NULL,
                account TEXT NOT NULL,
                principal TEXT NOT NULL,
                last_update_ts INTEGER NOT NULL,
                PRIMARY KEY (asset, account)
            );
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY,
                body TEXT NOT NULL
            );
            "#,
        )?;
        debug!(path = %path.display(), "store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))
    }

    /// Replace the persisted state with `snapshot` and `custody` in one transaction.
    pub fn save<C: Serialize>(
        &self,
        snapshot: &LedgerSnapshot,
        custody: &C,
    ) -> Result<(), StoreError> {
        let custody_json = serde_json::to_string(custody)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM meta; DELETE FROM assets; DELETE FROM positions; DELETE FROM events;",
        )?;
        {
            let mut meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(["schema_version", SCHEMA_VERSION])?;
            meta.execute(["owner", snapshot.registry.owner().as_str()])?;
            meta.execute(["custody", custody_json.as_str()])?;

            let mut assets = tx.prepare("INSERT INTO assets (asset, supported) VALUES (?1, ?2)")?;
            for (asset, on) in snapshot.registry.entries() {
                assets.execute(rusqlite::params![asset.to_string(), on])?;
            }

            let mut positions = tx.prepare(
                "INSERT INTO positions (asset, account, principal, last_update_ts) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for r in &snapshot.positions {
                positions.execute(rusqlite::params![
                    r.asset.to_string(),
                    r.account,
                    r.position.principal.to_string(),
                    r.position.last_update_ts
                ])?;
            }

            let mut events = tx.prepare("INSERT INTO events (seq, body) VALUES (?1, ?2)")?;
            for ev in &snapshot.events {
                let seq = i64::try_from(ev.seq)
                    .map_err(|_| StoreError::Corrupt(format!("event seq {}", ev.seq)))?;
                events.execute(rusqlite::params![seq, serde_json::to_string(ev)?])?;
            }
        }
        tx.commit()?;
        info!(
            positions = snapshot.positions.len(),
            events = snapshot.events.len(),
            "ledger saved"
        );
        Ok(())
    }

    /// Load persisted state. `None` for a store that was never saved to.
    pub fn load<C: DeserializeOwned>(&self) -> Result<Option<(LedgerSnapshot, C)>, StoreError> {
        let conn = self.lock()?;
        let meta = |key: &str| -> Result<Option<String>, StoreError> {
            Ok(conn
                .query_row("SELECT value FROM meta WHERE key = ?1", [key], |r| {
                    r.get::<_, String>(0)
                })
                .optional()?)
        };
        let Some(owner) = meta("owner")? else {
            return Ok(None);
        };
        let custody_json =
            meta("custody")?.ok_or_else(|| StoreError::Corrupt("missing custody".into()))?;
        let custody: C = serde_json::from_str(&custody_json)?;

        let mut stmt = conn.prepare("SELECT asset, supported FROM assets ORDER BY asset")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, bool>(1)?)))?;
        let mut entries = Vec::new();
        for row in rows {
            let (asset, on) = row?;
            entries.push((asset.parse::<AssetId>()?, on));
        }
        let registry = AssetRegistry::from_entries(owner, entries);

        let mut stmt = conn.prepare(
            "SELECT asset, account, principal, last_update_ts FROM positions ORDER BY asset, account",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, i64>(3)?,
            ))
        })?;
        let mut positions = Vec::new();
        for row in rows {
            let (asset, account, principal, last_update_ts) = row?;
            let principal = principal
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("principal {principal:?}")))?;
            positions.push(PositionRecord {
                asset: asset.parse()?,
                account,
                position: Position {
                    principal,
                    last_update_ts,
                },
            });
        }

        let mut stmt = conn.prepare("SELECT body FROM events ORDER BY seq")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut events = Vec::new();
        for row in rows {
            events.push(serde_json::from_str(&row?)?);
        }

        Ok(Some((
            LedgerSnapshot {
                registry,
                positions,
                events,
            },
            custody,
        )))
    }
}
