//! # Sera Ledger
//!
//! The narrow contracts through which Sera talks to an append-only public
//! ledger, plus two concrete ledgers.
//!
//! ## Overview
//!
//! Sera never talks to a network directly. It consumes three collaborators:
//!
//! - [`QueryService`] - tag-filtered, most-recent-first event queries
//! - [`KeyDirectory`] - the public key material bound to an address
//! - [`LedgerSubmitter`] - publishing transactions and reading balances
//!
//! [`Ledger`] is implemented for anything providing all three.
//!
//! ## Implementations
//!
//! - [`MemoryLedger`] - in-memory ledger with block mining and fault injection, for tests
//! - [`SqliteLedger`] - persistent ledger mirror backed by SQLite
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sera_core::{Address, EventFilter};
//! use sera_ledger::{MemoryLedger, QueryService};
//!
//! async fn example(address: Address) {
//!     let ledger = MemoryLedger::new();
//!     let creates = ledger
//!         .query_all_events(&EventFilter::created_by(&address))
//!         .await
//!         .unwrap();
//!     println!("{} credentials created", creates.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: events are never mutated except for block inclusion metadata
//! - **Content-addressed ids**: transaction ids are Blake3 over the CBOR draft and its ledger position
//! - **Idempotent ingest**: inserting an event whose id is known returns `AlreadyExists`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{InsertResult, KeyDirectory, Ledger, LedgerSubmitter, QueryService, TransactionDraft};
