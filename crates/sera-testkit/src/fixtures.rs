//! Test fixtures and helpers.
//!
//! Common setup code for unit and integration tests.

use std::sync::Arc;

use bytes::Bytes;
use sera_core::{
    lifecycle_tags, Action, Address, BlockInfo, CredentialId, TxId, DEFAULT_APP_NAME,
};
use sera_envelope::Wallet;
use sera_ledger::{LedgerSubmitter, MemoryLedger, TransactionDraft};

const ALICE_PEM: &str = include_str!("../fixtures/alice.pem");
const BOB_PEM: &str = include_str!("../fixtures/bob.pem");
const CAROL_PEM: &str = include_str!("../fixtures/carol-3072.pem");

/// A 4096-bit wallet.
pub fn alice() -> Wallet {
    Wallet::from_pkcs8_pem(ALICE_PEM).expect("alice fixture key")
}

/// A second 4096-bit wallet.
pub fn bob() -> Wallet {
    Wallet::from_pkcs8_pem(BOB_PEM).expect("bob fixture key")
}

/// A 3072-bit wallet, the smallest size an envelope accepts.
pub fn carol_3072() -> Wallet {
    Wallet::from_pkcs8_pem(CAROL_PEM).expect("carol fixture key")
}

/// Install a `tracing` subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A publishing identity.
///
/// Resolution never looks inside envelopes, so seeded publishers use an
/// arbitrary byte string as their owner key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publisher {
    pub owner_key: Vec<u8>,
    pub address: Address,
}

impl Publisher {
    /// A deterministic publisher from a one-byte seed.
    pub fn new(seed: u8) -> Self {
        let owner_key = vec![seed; 64];
        let address = Address::from_owner_key(&owner_key);
        Self { owner_key, address }
    }
}

impl From<&Wallet> for Publisher {
    fn from(wallet: &Wallet) -> Self {
        Self {
            owner_key: wallet.owner_key(),
            address: wallet.address().clone(),
        }
    }
}

/// A memory ledger plus shortcuts for publishing lifecycle events.
pub struct LedgerFixture {
    pub ledger: Arc<MemoryLedger>,
    pub app_name: String,
}

impl LedgerFixture {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(MemoryLedger::new()),
            app_name: DEFAULT_APP_NAME.to_owned(),
        }
    }

    fn draft(&self, from: &Publisher, id: &str, action: Action) -> TransactionDraft {
        let id = CredentialId::new(id).expect("fixture credential id");
        TransactionDraft::new(from.owner_key.clone(), Bytes::from_static(b"fixture"))
            .with_tags(lifecycle_tags(&self.app_name, &id, action))
    }

    /// Publish a pending event with no recipient.
    pub async fn publish(&self, from: &Publisher, id: &str, action: Action) -> TxId {
        self.ledger
            .submit(self.draft(from, id, action))
            .await
            .expect("publish fixture event")
    }

    /// Publish a pending `Share` of `id` addressed to `to`.
    pub async fn share(&self, from: &Publisher, to: &Address, id: &str) -> TxId {
        self.ledger
            .submit(self.draft(from, id, Action::Share).with_target(to.clone()))
            .await
            .expect("publish fixture share")
    }

    /// Insert an event directly, with an arbitrary block height.
    ///
    /// Lets tests build histories whose publication order disagrees with
    /// their block order.
    pub fn fabricate(
        &self,
        from: &Publisher,
        target: Option<&Address>,
        id: &str,
        action: Action,
        height: Option<u64>,
    ) -> TxId {
        let mut draft = self.draft(from, id, action);
        if let Some(target) = target {
            draft = draft.with_target(target.clone());
        }
        let position = self.ledger.len().expect("ledger length") as u64 + 1;
        let tx_id = draft.content_id(position).expect("fixture tx id");
        let block = height.map(|height| BlockInfo {
            height,
            timestamp: height as i64 * 120,
        });
        self.ledger
            .ingest(draft.into_event(tx_id, block))
            .expect("ingest fixture event");
        tx_id
    }

    /// Confirm every pending event. Returns the new block height.
    pub fn mine(&self) -> u64 {
        self.ledger.mine().expect("mine fixture block")
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sera_core::EventFilter;
    use sera_ledger::QueryService;

    #[test]
    fn test_wallet_fixtures_load() {
        assert_eq!(alice().modulus_bits(), 4096);
        assert_eq!(bob().modulus_bits(), 4096);
        assert_eq!(carol_3072().modulus_bits(), 3072);
        assert_ne!(alice().address(), bob().address());
    }

    #[tokio::test]
    async fn test_publish_and_share() {
        let fixture = LedgerFixture::new();
        let (a, b) = (Publisher::new(1), Publisher::new(2));

        fixture.publish(&a, "x1", Action::Create).await;
        let share = fixture.share(&a, &b.address, "x1").await;

        let shared = fixture
            .ledger
            .query_all_events(&EventFilter::shared_with(&b.address))
            .await
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].tx_id, share);
        assert_eq!(shared[0].credential_id().unwrap().as_str(), "x1");
    }

    #[test]
    fn test_fabricate_keeps_block() {
        let fixture = LedgerFixture::new();
        let a = Publisher::new(1);

        let first = fixture.fabricate(&a, None, "x1", Action::Edit, Some(9));
        let second = fixture.fabricate(&a, None, "x1", Action::Edit, Some(9));
        assert_ne!(first, second);
        assert_eq!(fixture.ledger.len().unwrap(), 2);
    }
}
