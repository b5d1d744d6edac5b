//! Database schema migrations for the SQLite ledger.
//!
//! Simple versioned migrations. Each migration transforms the schema from
//! version N to N+1.

use rusqlite::Connection;

use crate::error::{LedgerError, Result};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated ledger schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(LedgerError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Events in publication order
        CREATE TABLE events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_id BLOB NOT NULL UNIQUE,        -- 32 bytes
            owner TEXT NOT NULL,               -- base64url address
            owner_key BLOB NOT NULL,           -- RSA modulus, big-endian
            target TEXT,                       -- recipient address, nullable
            quantity TEXT NOT NULL,            -- winston, decimal string
            app_name TEXT,                     -- first App-Name tag
            credential_id TEXT,                -- first ID tag
            action TEXT,                       -- first Action tag
            tags BLOB NOT NULL,                -- CBOR array of all tags
            body BLOB NOT NULL,
            block_height INTEGER,              -- NULL while pending
            block_timestamp INTEGER
        );

        CREATE INDEX idx_events_owner ON events(owner, action, credential_id);
        CREATE INDEX idx_events_target ON events(target, action, credential_id);

        CREATE TABLE blocks (
            height INTEGER PRIMARY KEY,
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE balances (
            address TEXT PRIMARY KEY,
            winston TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
