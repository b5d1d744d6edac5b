//! # Sera
//!
//! The unified API for Sera: credentials stored on an append-only public
//! ledger, readable only by their intended recipients.
//!
//! ## Overview
//!
//! - **Envelopes**: Every value is sealed to a single RSA key. Nobody else,
//!   including the ledger, can read it.
//! - **Events**: Credentials are never edited in place. Create, Edit, Share
//!   and Remove are separate immutable transactions tagged with the id.
//! - **Resolution**: The current value is a projection of those events
//!   (latest edit, else the create, else the share), and a remove is final.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sera::{FixedPriceOracle, Vault, VaultConfig};
//! use sera::core::{Credential, CredentialUpdate};
//! use sera::envelope::Wallet;
//! use sera::ledger::SqliteLedger;
//!
//! async fn example(pem: &str) -> sera::Result<()> {
//!     let wallet = Wallet::from_pkcs8_pem(pem)?;
//!     let ledger = Arc::new(SqliteLedger::open("sera.db")?);
//!     let oracle = Arc::new(FixedPriceOracle(8.0));
//!
//!     let vault = Vault::new(wallet, ledger, oracle, VaultConfig::default())?;
//!
//!     let (id, _tx) = vault
//!         .create(&Credential::new("example.com", "user", "hunter2"))
//!         .await?;
//!     vault.edit(&id, &CredentialUpdate::password("correct horse")).await?;
//!
//!     for stored in vault.credentials().await? {
//!         println!("{} {:?}", stored.id, stored.credential);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `sera::core` - Data model (Credential, Event, Address, etc.)
//! - `sera::ledger` - Ledger contracts plus memory and SQLite ledgers
//! - `sera::envelope` - Envelope codec and wallets
//! - `sera::resolver` - History resolution

pub mod error;
pub mod fee;
pub mod vault;

// Re-export component crates
pub use sera_core as core;
pub use sera_envelope as envelope;
pub use sera_ledger as ledger;
pub use sera_resolver as resolver;

// Re-export main types for convenience
pub use error::{Result, VaultError};
pub use fee::{
    usd_to_winston, FallbackOracle, FeeConfig, FeeKind, FixedPriceOracle, PriceOracle, FEE_WALLET,
};
pub use vault::{StoredCredential, Vault, VaultConfig};

// Re-export commonly used core types
pub use sera_core::{Address, Credential, CredentialId, CredentialUpdate, TxId, Winston};
