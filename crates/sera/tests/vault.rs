//! End-to-end vault behavior against an in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use sera::core::{lifecycle_tags, Action, EventFilter, DEFAULT_APP_NAME};
use sera::envelope::EnvelopeCodec;
use sera::ledger::{LedgerSubmitter, MemoryLedger, QueryService, SqliteLedger, TransactionDraft};
use sera::resolver::{HistoryResolver, ResolverConfig};
use sera::{
    Address, Credential, CredentialId, CredentialUpdate, FeeKind, FixedPriceOracle, PriceOracle,
    Vault, VaultConfig, VaultError, Winston,
};
use sera_testkit::{alice, bob, carol_3072, init_tracing, LedgerFixture};

/// 10 USD per AR: create fee 0.05 AR, share fee 0.025 AR.
const PRICE: f64 = 10.0;
const CREATE_FEE: Winston = Winston(50_000_000_000);
const SHARE_FEE: Winston = Winston(25_000_000_000);

fn vault_for(wallet: sera::envelope::Wallet, ledger: &Arc<MemoryLedger>) -> Vault<MemoryLedger> {
    Vault::new(
        wallet,
        Arc::clone(ledger),
        Arc::new(FixedPriceOracle(PRICE)),
        VaultConfig::default(),
    )
    .unwrap()
}

fn fee_wallet() -> Address {
    Address::parse(sera::FEE_WALLET).unwrap()
}

#[tokio::test]
async fn test_create_then_edit_resolves_to_edit() {
    init_tracing();
    let fixture = LedgerFixture::new();
    let alice = alice();
    let owner_key = alice.owner_key();
    let address = alice.address().clone();
    let codec = EnvelopeCodec::default();
    let x1 = CredentialId::new("x1").unwrap();

    let publish = |action: Action, credential: Credential| {
        let envelope = codec
            .encrypt(&credential, &alice.encryption_key())
            .unwrap();
        TransactionDraft::new(owner_key.clone(), envelope)
            .with_tags(lifecycle_tags(DEFAULT_APP_NAME, &x1, action))
    };

    fixture
        .ledger
        .submit(publish(Action::Create, Credential::new("ex.com", "u", "p")))
        .await
        .unwrap();
    let edit = fixture
        .ledger
        .submit(publish(Action::Edit, Credential::new("ex.com", "u", "p2")))
        .await
        .unwrap();

    let resolver = HistoryResolver::new(Arc::clone(&fixture.ledger), ResolverConfig::default());
    let current = resolver.resolve_current(&x1, &address).await.unwrap();
    assert_eq!(current.tx_id, edit);
    assert_eq!(current.action, Action::Edit);

    let body = fixture.ledger.fetch_body(&current.tx_id).await.unwrap().unwrap();
    let opened = codec.decrypt(&body, alice.decryption_key()).unwrap();
    assert_eq!(opened.password, "p2");
    assert_eq!(opened.site, "ex.com");
}

#[tokio::test]
async fn test_vault_lifecycle() {
    let fixture = LedgerFixture::new();
    let vault = vault_for(alice(), &fixture.ledger);

    let (id, created) = vault
        .create(&Credential::new("ex.com", "u", "p"))
        .await
        .unwrap();
    assert_eq!(id.as_str().len(), 21);

    let stored = vault.credential(&id).await.unwrap();
    assert_eq!(stored.current.tx_id, created);
    assert!(!stored.current.is_confirmed());
    assert!(!stored.shared);
    assert_eq!(stored.credential, Credential::new("ex.com", "u", "p"));

    let edited = vault
        .edit(&id, &CredentialUpdate::password("p2"))
        .await
        .unwrap();
    fixture.mine();

    let stored = vault.credential(&id).await.unwrap();
    assert_eq!(stored.current.tx_id, edited);
    assert!(stored.current.is_confirmed());
    assert_eq!(stored.credential, Credential::new("ex.com", "u", "p2"));

    vault.edit(&id, &CredentialUpdate::username("u2")).await.unwrap();
    let listed = vault.credentials().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].credential, Credential::new("ex.com", "u2", "p2"));

    vault.remove(&id).await.unwrap();
    assert!(vault.credentials().await.unwrap().is_empty());
    assert!(vault.credential(&id).await.unwrap_err().is_not_found());
    assert!(vault
        .edit(&id, &CredentialUpdate::password("p3"))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(vault.remove(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_empty_edit_is_rejected() {
    let fixture = LedgerFixture::new();
    let vault = vault_for(alice(), &fixture.ledger);
    let (id, _) = vault.create(&Credential::new("a", "b", "c")).await.unwrap();

    assert!(matches!(
        vault.edit(&id, &CredentialUpdate::default()).await,
        Err(VaultError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn test_share_gives_recipient_an_independent_copy() {
    let fixture = LedgerFixture::new();
    let alice = vault_for(alice(), &fixture.ledger);
    let bob = vault_for(bob(), &fixture.ledger);
    fixture.ledger.credit(alice.address(), Winston(1_000_000_000_000)).unwrap();

    // Bob has to publish once before his key can be found.
    assert!(matches!(
        {
            let (id, _) = alice.create(&Credential::new("ex.com", "u", "p")).await.unwrap();
            alice.share(&id, bob.address()).await
        },
        Err(VaultError::Envelope(sera::envelope::EnvelopeError::KeyNotFound(_)))
    ));
    bob.create(&Credential::new("bob.net", "bob", "b")).await.unwrap();

    let (id, _) = alice
        .create(&Credential::new("team.io", "shared", "s3cret"))
        .await
        .unwrap();
    alice.share(&id, bob.address()).await.unwrap();

    let listed = bob.credentials().await.unwrap();
    assert_eq!(listed.len(), 2);
    let copy = listed.iter().find(|c| c.id == id).unwrap();
    assert!(copy.shared);
    assert_eq!(copy.current.action, Action::Share);
    assert_eq!(copy.credential, Credential::new("team.io", "shared", "s3cret"));

    // Bob edits his copy; alice's value is untouched.
    bob.edit(&id, &CredentialUpdate::password("bobs")).await.unwrap();
    let bobs = bob.credential(&id).await.unwrap();
    assert!(bobs.shared);
    assert_eq!(bobs.credential.password, "bobs");
    assert_eq!(alice.credential(&id).await.unwrap().credential.password, "s3cret");

    // Bob removing his copy leaves alice's in place.
    bob.remove(&id).await.unwrap();
    assert!(bob.credential(&id).await.unwrap_err().is_not_found());
    assert!(alice.credential(&id).await.is_ok());

    // The share fee went to the fee wallet in a separate transaction.
    let fees = fixture
        .ledger
        .query_all_events(&EventFilter {
            action: Some(Action::ShareFee),
            ..EventFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(fees.len(), 1);
    assert_eq!(fees[0].quantity, SHARE_FEE);
    assert_eq!(fees[0].target.as_ref(), Some(&fee_wallet()));
}

#[tokio::test]
async fn test_share_with_self_is_rejected() {
    let fixture = LedgerFixture::new();
    let vault = vault_for(alice(), &fixture.ledger);
    let (id, _) = vault.create(&Credential::new("a", "b", "c")).await.unwrap();

    assert!(matches!(
        vault.share(&id, &vault.address().clone()).await,
        Err(VaultError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn test_create_fees_after_free_allowance() {
    let fixture = LedgerFixture::new();
    let vault = vault_for(alice(), &fixture.ledger);

    assert_eq!(vault.fee(FeeKind::Create).await.unwrap(), Winston::ZERO);
    vault.create(&Credential::new("a.com", "u", "1")).await.unwrap();
    vault.create(&Credential::new("b.com", "u", "2")).await.unwrap();
    assert_eq!(vault.fee(FeeKind::Create).await.unwrap(), CREATE_FEE);
    assert_eq!(vault.fee(FeeKind::Share).await.unwrap(), SHARE_FEE);

    let err = vault
        .create(&Credential::new("c.com", "u", "3"))
        .await
        .unwrap_err();
    match err {
        VaultError::InsufficientFunds {
            required,
            available,
        } => {
            assert_eq!(required, CREATE_FEE);
            assert_eq!(available, Winston::ZERO);
        }
        other => panic!("expected insufficient funds, got {other:?}"),
    }

    fixture.ledger.credit(vault.address(), Winston(60_000_000_000)).unwrap();
    vault.create(&Credential::new("c.com", "u", "3")).await.unwrap();

    assert_eq!(vault.balance().await.unwrap(), Winston(10_000_000_000));
    assert_eq!(
        fixture.ledger.balance(&fee_wallet()).await.unwrap(),
        CREATE_FEE
    );
    assert_eq!(vault.credentials().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_outage_is_retryable() {
    let fixture = LedgerFixture::new();
    let vault = vault_for(alice(), &fixture.ledger);
    vault.create(&Credential::new("a", "b", "c")).await.unwrap();

    fixture.ledger.set_unavailable(true).unwrap();
    let err = vault.credentials().await.unwrap_err();
    assert!(err.is_retryable());
    assert!(!err.is_not_found());

    fixture.ledger.set_unavailable(false).unwrap();
    assert_eq!(vault.credentials().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_submission_times_out() {
    let fixture = LedgerFixture::new();
    let config = VaultConfig {
        resolver: ResolverConfig {
            query_timeout: Duration::from_millis(100),
            ..ResolverConfig::default()
        },
        ..VaultConfig::default()
    };
    let vault = Vault::new(
        alice(),
        Arc::clone(&fixture.ledger),
        Arc::new(FixedPriceOracle(PRICE)),
        config,
    )
    .unwrap();

    fixture.ledger.set_latency(Some(Duration::from_secs(5))).unwrap();
    let err = vault
        .create(&Credential::new("a", "b", "c"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

/// An oracle that never answers.
struct Hung;

#[async_trait]
impl PriceOracle for Hung {
    async fn usd_per_ar(&self) -> sera::Result<f64> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_hung_oracle_times_out() {
    let fixture = LedgerFixture::new();
    let vault = Vault::new(
        alice(),
        Arc::clone(&fixture.ledger),
        Arc::new(Hung),
        VaultConfig::default(),
    )
    .unwrap();

    // Free creates never ask for a price.
    vault.create(&Credential::new("a.com", "u", "1")).await.unwrap();
    vault.create(&Credential::new("b.com", "u", "2")).await.unwrap();

    let err = vault
        .create(&Credential::new("c.com", "u", "3"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(vault.credentials().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_share_of_removed_credential_is_not_found() {
    let fixture = LedgerFixture::new();
    let alice = vault_for(alice(), &fixture.ledger);
    let bob = vault_for(bob(), &fixture.ledger);
    fixture.ledger.credit(alice.address(), Winston(1_000_000_000_000)).unwrap();
    bob.create(&Credential::new("bob.net", "bob", "b")).await.unwrap();

    let (id, _) = alice.create(&Credential::new("a", "b", "c")).await.unwrap();
    alice.remove(&id).await.unwrap();

    assert!(alice.share(&id, bob.address()).await.unwrap_err().is_not_found());
    assert_eq!(alice.balance().await.unwrap(), Winston(1_000_000_000_000));
    assert_eq!(bob.credentials().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_config_is_validated() {
    let fixture = LedgerFixture::new();

    let wrong_size = Vault::new(
        carol_3072(),
        Arc::clone(&fixture.ledger),
        Arc::new(FixedPriceOracle(PRICE)),
        VaultConfig::default(),
    );
    assert!(matches!(wrong_size, Err(VaultError::Config(_))));

    let mut config = VaultConfig::default();
    config.fees.fee_wallet = "nope".into();
    let bad_wallet = Vault::new(
        alice(),
        Arc::clone(&fixture.ledger),
        Arc::new(FixedPriceOracle(PRICE)),
        config,
    );
    assert!(matches!(bad_wallet, Err(VaultError::Config(_))));

    let smaller = Vault::new(
        carol_3072(),
        Arc::clone(&fixture.ledger),
        Arc::new(FixedPriceOracle(PRICE)),
        VaultConfig {
            modulus_bits: 3072,
            ..VaultConfig::default()
        },
    )
    .unwrap();
    let (id, _) = smaller.create(&Credential::new("a", "b", "c")).await.unwrap();
    assert_eq!(smaller.credential(&id).await.unwrap().credential.site, "a");
}

#[test]
fn test_vault_config_from_json() {
    let config: VaultConfig = serde_json::from_str(
        r#"{"fees":{"free_creates":5},"resolver":{"app_name":"Sera-Test"}}"#,
    )
    .unwrap();
    assert_eq!(config.fees.free_creates, 5);
    assert_eq!(config.fees.share_fee_usd, 0.25);
    assert_eq!(config.resolver.app_name, "Sera-Test");
    assert_eq!(config.modulus_bits, 4096);
}

#[tokio::test]
async fn test_vault_on_sqlite_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sera.db");
    let id;

    {
        let ledger = Arc::new(SqliteLedger::open(&path).unwrap());
        let vault = Vault::new(
            alice(),
            ledger,
            Arc::new(FixedPriceOracle(PRICE)),
            VaultConfig::default(),
        )
        .unwrap();
        id = vault
            .create(&Credential::new("ex.com", "u", "p"))
            .await
            .unwrap()
            .0;
        vault.edit(&id, &CredentialUpdate::password("p2")).await.unwrap();
    }

    let ledger = Arc::new(SqliteLedger::open(&path).unwrap());
    ledger.mine().await.unwrap();
    let vault = Vault::new(
        alice(),
        ledger,
        Arc::new(FixedPriceOracle(PRICE)),
        VaultConfig::default(),
    )
    .unwrap();

    let stored = vault.credential(&id).await.unwrap();
    assert_eq!(stored.credential.password, "p2");
    assert_eq!(stored.current.action, Action::Edit);
    assert!(stored.current.is_confirmed());
}
