//! In-memory implementation of the ledger collaborators.
//!
//! This is primarily for testing. Transactions land as pending events and
//! are confirmed by [`MemoryLedger::mine`]. Outages and slow responses can be
//! injected to exercise retry and timeout paths.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use sera_core::{Address, BlockInfo, Event, EventFilter, TxId, Winston};

use crate::error::{LedgerError, Result};
use crate::traits::{InsertResult, KeyDirectory, LedgerSubmitter, QueryService, TransactionDraft};

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

#[derive(Default)]
struct MemoryLedgerInner {
    /// Events in publication order.
    events: Vec<Event>,

    /// Index: tx id -> position in `events`.
    by_tx: HashMap<TxId, usize>,

    /// Height of the last mined block.
    height: u64,

    balances: HashMap<Address, Winston>,

    /// Fault injection.
    unavailable: bool,
    latency: Option<Duration>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryLedgerInner>> {
        self.inner
            .read()
            .map_err(|e| LedgerError::Internal(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryLedgerInner>> {
        self.inner
            .write()
            .map_err(|e| LedgerError::Internal(format!("lock poisoned: {e}")))
    }

    /// Make every call fail with [`LedgerError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) -> Result<()> {
        self.write()?.unavailable = unavailable;
        Ok(())
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) -> Result<()> {
        self.write()?.latency = latency;
        Ok(())
    }

    /// Add funds to an address.
    pub fn credit(&self, address: &Address, amount: Winston) -> Result<()> {
        let mut inner = self.write()?;
        let balance = inner.balances.entry(address.clone()).or_default();
        balance.0 = balance.0.saturating_add(amount.0);
        Ok(())
    }

    /// Confirm every pending event into a new block. Returns the block height.
    pub fn mine(&self) -> Result<u64> {
        let mut inner = self.write()?;
        inner.height += 1;
        let block = BlockInfo {
            height: inner.height,
            timestamp: now_secs(),
        };
        for event in inner.events.iter_mut().filter(|e| e.block.is_none()) {
            event.block = Some(block);
        }
        tracing::debug!(height = block.height, "mined block");
        Ok(block.height)
    }

    /// Insert an already-published event as-is.
    ///
    /// Used to mirror events fetched elsewhere and to fabricate histories.
    pub fn ingest(&self, event: Event) -> Result<InsertResult> {
        let mut inner = self.write()?;
        if inner.by_tx.contains_key(&event.tx_id) {
            return Ok(InsertResult::AlreadyExists);
        }
        let position = inner.events.len();
        inner.by_tx.insert(event.tx_id, position);
        inner.events.push(event);
        Ok(InsertResult::Inserted)
    }

    /// Number of events on the ledger.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.events.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.events.is_empty())
    }

    /// Apply injected faults. The guard is dropped before sleeping.
    async fn simulate_network(&self) -> Result<()> {
        let (unavailable, latency) = {
            let inner = self.read()?;
            (inner.unavailable, inner.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if unavailable {
            return Err(LedgerError::Unavailable("memory ledger offline".into()));
        }
        Ok(())
    }

    fn matching(&self, filter: &EventFilter, limit: Option<usize>) -> Result<Vec<Event>> {
        let inner = self.read()?;
        let matches = inner.events.iter().rev().filter(|e| filter.matches(e)).cloned();
        Ok(match limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryService for MemoryLedger {
    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.simulate_network().await?;
        self.matching(filter, Some(filter.page_size()))
    }

    async fn query_all_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.simulate_network().await?;
        self.matching(filter, None)
    }

    async fn fetch_body(&self, tx_id: &TxId) -> Result<Option<Bytes>> {
        self.simulate_network().await?;
        let inner = self.read()?;
        Ok(inner
            .by_tx
            .get(tx_id)
            .map(|&position| inner.events[position].body.clone()))
    }
}

#[async_trait]
impl KeyDirectory for MemoryLedger {
    async fn lookup_owner_key(&self, address: &Address) -> Result<Option<Bytes>> {
        self.simulate_network().await?;
        let inner = self.read()?;
        Ok(inner
            .events
            .iter()
            .rev()
            .find(|e| &e.owner == address)
            .map(|e| e.owner_key.clone()))
    }
}

#[async_trait]
impl LedgerSubmitter for MemoryLedger {
    async fn submit(&self, draft: TransactionDraft) -> Result<TxId> {
        self.simulate_network().await?;
        let owner = draft.owner();

        let mut inner = self.write()?;
        let position = inner.events.len() as u64 + 1;
        let tx_id = draft.content_id(position)?;

        if !draft.quantity.is_zero() {
            let target = draft
                .target
                .clone()
                .ok_or_else(|| LedgerError::Rejected("transfer without target".into()))?;
            let available = inner.balances.get(&owner).copied().unwrap_or_default();
            if available < draft.quantity {
                return Err(LedgerError::Rejected(format!(
                    "insufficient balance: {available} < {}",
                    draft.quantity
                )));
            }
            inner.balances.insert(owner.clone(), Winston(available.0 - draft.quantity.0));
            let credited = inner.balances.entry(target).or_default();
            credited.0 = credited.0.saturating_add(draft.quantity.0);
        }

        let event = draft.into_event(tx_id, None);
        let index = inner.events.len();
        inner.by_tx.insert(tx_id, index);
        inner.events.push(event);

        tracing::debug!(%tx_id, %owner, "submitted transaction");
        Ok(tx_id)
    }

    async fn balance(&self, address: &Address) -> Result<Winston> {
        self.simulate_network().await?;
        Ok(self
            .read()?
            .balances
            .get(address)
            .copied()
            .unwrap_or_default())
    }
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
