//! # Sera Core
//!
//! Pure data model for Sera: ledger identities, credential events, and the
//! structured secret that travels inside encrypted envelopes.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Address`] - A ledger identity, derived from the owner's RSA modulus
//! - [`TxId`] - Content-addressed identifier of a published transaction
//! - [`CredentialId`] - Opaque, caller-chosen identifier of a credential
//! - [`Event`] - One immutable, tagged lifecycle record (Create/Edit/Share/Remove)
//! - [`EventFilter`] - The tag filter understood by query collaborators
//! - [`Credential`] - The secret itself: site, username, password
//!
//! ## Canonical Encoding
//!
//! Credentials are encoded as compact JSON with a fixed field order
//! (`site`, `username`, `password`). See [`Credential::to_canonical_bytes`].

pub mod credential;
pub mod error;
pub mod event;
pub mod types;

pub use credential::{Credential, CredentialUpdate};
pub use error::{CoreError, Result};
pub use event::{
    lifecycle_tags, Action, BlockInfo, Event, EventFilter, Tag, ACTION_TAG, APP_NAME_TAG,
    DEFAULT_APP_NAME, DEFAULT_PAGE_SIZE, ID_TAG,
};
pub use types::{Address, CredentialId, TxId, Winston, WINSTON_PER_AR};
