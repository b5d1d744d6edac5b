//! SQLite implementation of the ledger collaborators.
//!
//! A persistent ledger mirror: events fetched from a gateway can be ingested
//! with [`SqliteLedger::insert_event`] and then queried offline through the
//! same traits the resolver uses. Uses rusqlite with bundled SQLite, wrapped
//! in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use sera_core::{
    Address, BlockInfo, CoreError, Event, EventFilter, Tag, TxId, Winston, ACTION_TAG,
    APP_NAME_TAG, ID_TAG,
};

use crate::error::{LedgerError, Result};
use crate::migration;
use crate::traits::{InsertResult, KeyDirectory, LedgerSubmitter, QueryService, TransactionDraft};

/// SQLite-backed ledger.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| LedgerError::Internal(format!("mutex poisoned: {e}")))?;
            f(&mut conn)
        })
        .await?
    }

    /// Mirror an already-published event.
    pub async fn insert_event(&self, event: &Event) -> Result<InsertResult> {
        let event = event.clone();
        self.blocking(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT seq FROM events WHERE tx_id = ?1",
                    params![event.tx_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Ok(InsertResult::AlreadyExists);
            }
            insert_event_row(conn, &event)?;
            Ok(InsertResult::Inserted)
        })
        .await
    }

    /// Confirm every pending event into a new block. Returns the block height.
    pub async fn mine(&self) -> Result<u64> {
        self.blocking(|conn| {
            let tx = conn.transaction()?;
            let height: i64 = tx.query_row(
                "SELECT COALESCE(MAX(height), 0) + 1 FROM blocks",
                [],
                |row| row.get(0),
            )?;
            let timestamp = now_secs();
            tx.execute(
                "INSERT INTO blocks (height, timestamp) VALUES (?1, ?2)",
                params![height, timestamp],
            )?;
            let confirmed = tx.execute(
                "UPDATE events SET block_height = ?1, block_timestamp = ?2
                 WHERE block_height IS NULL",
                params![height, timestamp],
            )?;
            tx.commit()?;
            tracing::debug!(height, confirmed, "mined block");
            Ok(height as u64)
        })
        .await
    }

    /// Add funds to an address.
    pub async fn credit(&self, address: &Address, amount: Winston) -> Result<()> {
        let address = address.clone();
        self.blocking(move |conn| {
            let current = read_balance(conn, &address)?;
            write_balance(conn, &address, Winston(current.0.saturating_add(amount.0)))
        })
        .await
    }
}

fn insert_event_row(conn: &Connection, event: &Event) -> Result<()> {
    let mut tags = Vec::new();
    ciborium::into_writer(&event.tags, &mut tags)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;

    conn.execute(
        "INSERT INTO events (
            tx_id, owner, owner_key, target, quantity, app_name, credential_id,
            action, tags, body, block_height, block_timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            event.tx_id.as_bytes().as_slice(),
            event.owner.as_str(),
            &event.owner_key[..],
            event.target.as_ref().map(Address::as_str),
            event.quantity.0.to_string(),
            event.tag(APP_NAME_TAG),
            event.tag(ID_TAG),
            event.tag(ACTION_TAG),
            tags,
            &event.body[..],
            event.block.map(|b| b.height as i64),
            event.block.map(|b| b.timestamp),
        ],
    )?;
    Ok(())
}

fn select_events(conn: &Connection, filter: &EventFilter, limit: Option<usize>) -> Result<Vec<Event>> {
    let mut sql = String::from(
        "SELECT tx_id, owner, owner_key, target, quantity, tags, body, block_height, block_timestamp
         FROM events WHERE 1 = 1",
    );
    let mut values: Vec<Value> = Vec::new();
    let mut push = |column: &str, value: Value, values: &mut Vec<Value>| {
        values.push(value);
        sql.push_str(&format!(" AND {column} = ?{}", values.len()));
    };

    if let Some(app_name) = &filter.app_name {
        push("app_name", Value::Text(app_name.clone()), &mut values);
    }
    if let Some(owner) = &filter.owner {
        push("owner", Value::Text(owner.to_string()), &mut values);
    }
    if let Some(recipient) = &filter.recipient {
        push("target", Value::Text(recipient.to_string()), &mut values);
    }
    if let Some(id) = &filter.id {
        push("credential_id", Value::Text(id.to_string()), &mut values);
    }
    if let Some(action) = filter.action {
        push("action", Value::Text(action.as_str().to_owned()), &mut values);
    }

    sql.push_str(" ORDER BY seq DESC");
    if let Some(limit) = limit {
        values.push(Value::Integer(limit as i64));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params_from_iter(values.iter()), row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let tx_id: Vec<u8> = row.get(0)?;
    let tx_id = TxId::try_from(tx_id.as_slice()).map_err(|e| conversion(0, Type::Blob, e))?;

    let owner: String = row.get(1)?;
    let owner = Address::parse(&owner).map_err(|e| conversion(1, Type::Text, e))?;

    let owner_key: Vec<u8> = row.get(2)?;

    let target: Option<String> = row.get(3)?;
    let target = target
        .map(|t| Address::parse(&t))
        .transpose()
        .map_err(|e| conversion(3, Type::Text, e))?;

    let quantity: String = row.get(4)?;
    let quantity = quantity
        .parse::<u128>()
        .map(Winston)
        .map_err(|e| conversion(4, Type::Text, e))?;

    let tags: Vec<u8> = row.get(5)?;
    let tags: Vec<Tag> = ciborium::from_reader(tags.as_slice())
        .map_err(|e| conversion(5, Type::Blob, CoreError::Serialization(e.to_string())))?;

    let body: Vec<u8> = row.get(6)?;

    let height: Option<i64> = row.get(7)?;
    let timestamp: Option<i64> = row.get(8)?;
    let block = match (height, timestamp) {
        (Some(height), Some(timestamp)) => Some(BlockInfo {
            height: height as u64,
            timestamp,
        }),
        _ => None,
    };

    Ok(Event {
        tx_id,
        owner,
        owner_key: Bytes::from(owner_key),
        target,
        quantity,
        tags,
        body: Bytes::from(body),
        block,
    })
}

fn conversion<E>(index: usize, ty: Type, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, ty, Box::new(e))
}

fn read_balance(conn: &Connection, address: &Address) -> Result<Winston> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT winston FROM balances WHERE address = ?1",
            params![address.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(s) => s
            .parse::<u128>()
            .map(Winston)
            .map_err(|e| LedgerError::InvalidData(format!("balance of {address}: {e}"))),
        None => Ok(Winston::ZERO),
    }
}

fn write_balance(conn: &Connection, address: &Address, amount: Winston) -> Result<()> {
    conn.execute(
        "INSERT INTO balances (address, winston) VALUES (?1, ?2)
         ON CONFLICT(address) DO UPDATE SET winston = excluded.winston",
        params![address.as_str(), amount.0.to_string()],
    )?;
    Ok(())
}

#[async_trait]
impl QueryService for SqliteLedger {
    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let filter = filter.clone();
        self.blocking(move |conn| select_events(conn, &filter, Some(filter.page_size())))
            .await
    }

    async fn query_all_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let filter = filter.clone();
        self.blocking(move |conn| select_events(conn, &filter, None))
            .await
    }

    async fn fetch_body(&self, tx_id: &TxId) -> Result<Option<Bytes>> {
        let tx_id = *tx_id;
        self.blocking(move |conn| {
            let body: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT body FROM events WHERE tx_id = ?1",
                    params![tx_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(body.map(Bytes::from))
        })
        .await
    }
}

#[async_trait]
impl KeyDirectory for SqliteLedger {
    async fn lookup_owner_key(&self, address: &Address) -> Result<Option<Bytes>> {
        let address = address.clone();
        self.blocking(move |conn| {
            let key: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT owner_key FROM events WHERE owner = ?1 ORDER BY seq DESC LIMIT 1",
                    params![address.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(key.map(Bytes::from))
        })
        .await
    }
}

#[async_trait]
impl LedgerSubmitter for SqliteLedger {
    async fn submit(&self, draft: TransactionDraft) -> Result<TxId> {
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let position: i64 =
                tx.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM events", [], |row| {
                    row.get(0)
                })?;
            let tx_id = draft.content_id(position as u64)?;
            let owner = draft.owner();

            if !draft.quantity.is_zero() {
                let target = draft
                    .target
                    .clone()
                    .ok_or_else(|| LedgerError::Rejected("transfer without target".into()))?;
                let available = read_balance(&tx, &owner)?;
                if available < draft.quantity {
                    return Err(LedgerError::Rejected(format!(
                        "insufficient balance: {available} < {}",
                        draft.quantity
                    )));
                }
                write_balance(&tx, &owner, Winston(available.0 - draft.quantity.0))?;
                let credited = read_balance(&tx, &target)?;
                write_balance(&tx, &target, Winston(credited.0.saturating_add(draft.quantity.0)))?;
            }

            insert_event_row(&tx, &draft.into_event(tx_id, None))?;
            tx.commit()?;

            tracing::debug!(%tx_id, %owner, "submitted transaction");
            Ok(tx_id)
        })
        .await
    }

    async fn balance(&self, address: &Address) -> Result<Winston> {
        let address = address.clone();
        self.blocking(move |conn| read_balance(conn, &address)).await
    }
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
