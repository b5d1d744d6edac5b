//! Collaborator traits: the abstract interface to the ledger.
//!
//! These traits keep resolution and encryption independent of any network
//! client. Implementations include an in-memory ledger (tests) and a SQLite
//! mirror; a gateway-backed client plugs in the same way.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use sera_core::{Address, BlockInfo, Event, EventFilter, Tag, TxId, Winston};

use crate::error::{LedgerError, Result};

/// Result of inserting an already-published event into a ledger mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Event was inserted.
    Inserted,
    /// Event with this transaction id already exists (idempotent - not an error).
    AlreadyExists,
}

/// An unsigned transaction handed to a [`LedgerSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// The publisher's RSA modulus. The owner address is derived from it.
    pub owner_key: Bytes,
    /// Recipient of the transfer or share.
    pub target: Option<Address>,
    /// Amount transferred to `target`.
    pub quantity: Winston,
    /// Transaction body.
    pub data: Bytes,
    /// Tags, in publication order.
    pub tags: Vec<Tag>,
}

impl TransactionDraft {
    /// Start a draft with a body and no transfer.
    pub fn new(owner_key: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        Self {
            owner_key: owner_key.into(),
            target: None,
            quantity: Winston::ZERO,
            data: data.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Address) -> Self {
        self.target = Some(target);
        self
    }

    /// Attach a token transfer to `target`.
    pub fn with_transfer(mut self, target: Address, quantity: Winston) -> Self {
        self.target = Some(target);
        self.quantity = quantity;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// The publishing address.
    pub fn owner(&self) -> Address {
        Address::from_owner_key(&self.owner_key)
    }

    /// Content address of this draft at a given ledger position.
    ///
    /// The position is mixed in so two identical drafts never share an id.
    pub fn content_id(&self, position: u64) -> Result<TxId> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut hasher = blake3::Hasher::new_derive_key("sera-ledger-v1 transaction id");
        hasher.update(&position.to_be_bytes());
        hasher.update(&buf);
        Ok(TxId::from_bytes(*hasher.finalize().as_bytes()))
    }

    /// The event this draft becomes once published under `tx_id`.
    pub fn into_event(self, tx_id: TxId, block: Option<BlockInfo>) -> Event {
        let owner = self.owner();
        Event {
            tx_id,
            owner,
            owner_key: self.owner_key,
            target: self.target,
            quantity: self.quantity,
            tags: self.tags,
            body: self.data,
            block,
        }
    }
}

/// Tag-filtered access to published events.
///
/// Results are ordered most-recent-first on a best-effort basis. No ordering
/// is promised across separate calls.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// First page of matching events (at most `filter.page_size()`).
    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Every matching event, unpaginated.
    async fn query_all_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Body of a published transaction.
    async fn fetch_body(&self, tx_id: &TxId) -> Result<Option<Bytes>>;
}

/// Public key material bound to ledger addresses.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Owner modulus from the most recent record published by `address`.
    async fn lookup_owner_key(&self, address: &Address) -> Result<Option<Bytes>>;
}

/// Publishing transactions.
///
/// Signing, fee computation and broadcast are the implementation's concern.
#[async_trait]
pub trait LedgerSubmitter: Send + Sync {
    /// Publish a transaction and return its id.
    async fn submit(&self, draft: TransactionDraft) -> Result<TxId>;

    /// Spendable balance of an address.
    async fn balance(&self, address: &Address) -> Result<Winston>;
}

/// A full ledger: query, key directory and submission.
pub trait Ledger: QueryService + KeyDirectory + LedgerSubmitter {}

impl<T: QueryService + KeyDirectory + LedgerSubmitter + ?Sized> Ledger for T {}
