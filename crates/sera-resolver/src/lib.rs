//! # Sera Resolver
//!
//! Computes the current state of credentials from their ledger history.
//!
//! ## Overview
//!
//! Credentials are never updated in place. Each lifecycle action is a new,
//! immutable event tagged with the credential id:
//!
//! - **Create**: a credential sealed to its owner
//! - **Edit**: a replacement value, superseding the create or share
//! - **Share**: a copy sealed to a recipient, who then owns an independent lifecycle
//! - **Remove**: a tombstone; terminal, no later event revives the id
//!
//! The resolver turns these into two views: the live ids at an address
//! ([`HistoryResolver::list_live_credentials`]) and the event controlling one
//! id's current value ([`HistoryResolver::resolve_current`]). It works on tags
//! and ordering metadata only and never opens envelopes.
//!
//! The projections themselves are pure functions in [`projection`] so they
//! can be tested without a ledger.

pub mod config;
pub mod error;
pub mod projection;
pub mod resolver;

pub use config::{OrderingPolicy, ResolverConfig};
pub use error::{ResolverError, Result};
pub use projection::{
    candidates, order_events, project_live, select_current, CredentialLifecycle, LiveCredential,
    Origin, TIERS,
};
pub use resolver::{CurrentEvent, HistoryResolver};
