//! # Sera Testkit
//!
//! Testing utilities for Sera.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixed keys**: PKCS#8 RSA keys checked in under `fixtures/`, so tests
//!   never pay for 4096-bit key generation
//! - **Fixtures**: A shared [`MemoryLedger`](sera_ledger::MemoryLedger) plus
//!   helpers that publish raw lifecycle events with chosen tags and blocks
//! - **Generators**: Proptest strategies for credentials, ids and histories
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use sera_core::Action;
//! use sera_testkit::fixtures::{LedgerFixture, Publisher};
//!
//! # async fn example() {
//! let fixture = LedgerFixture::new();
//! let alice = Publisher::new(1);
//! fixture.publish(&alice, "x1", Action::Create).await;
//! fixture.publish(&alice, "x1", Action::Edit).await;
//! fixture.mine();
//! # }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{alice, bob, carol_3072, init_tracing, LedgerFixture, Publisher};
