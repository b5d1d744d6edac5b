//! The Vault: unified API for storing credentials on the ledger.
//!
//! The Vault brings together the ledger, the envelope codec, and the history
//! resolver behind one wallet-scoped interface.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};

use sera_core::{
    lifecycle_tags, Action, Address, Credential, CredentialId, CredentialUpdate, EventFilter,
    TxId, Winston,
};
use sera_envelope::{encryption_key_for, EnvelopeCodec, Wallet, DEFAULT_MODULUS_BITS};
use sera_ledger::{Ledger, TransactionDraft};
use sera_resolver::{CurrentEvent, HistoryResolver, Origin, ResolverConfig, ResolverError};

use crate::error::{Result, VaultError};
use crate::fee::{usd_to_winston, FeeConfig, FeeKind, PriceOracle};

/// Configuration for the Vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Resolution settings, including the application namespace.
    pub resolver: ResolverConfig,
    pub fees: FeeConfig,
    /// Modulus size of the wallets this vault seals for.
    pub modulus_bits: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            fees: FeeConfig::default(),
            modulus_bits: DEFAULT_MODULUS_BITS,
        }
    }
}

/// A decrypted credential together with the event it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub id: CredentialId,
    /// True when this wallet's copy originates from a share addressed to it.
    pub shared: bool,
    pub current: CurrentEvent,
    pub credential: Credential,
}

/// The main Vault struct.
///
/// Provides a unified API for:
/// - Creating, editing and removing credentials
/// - Sharing credentials with other addresses
/// - Listing and reading the current value of credentials
/// - Quoting fees
pub struct Vault<L: ?Sized> {
    wallet: Wallet,
    ledger: Arc<L>,
    resolver: HistoryResolver<L>,
    codec: EnvelopeCodec,
    oracle: Arc<dyn PriceOracle>,
    fee_wallet: Address,
    config: VaultConfig,
}

impl<L> Vault<L>
where
    L: Ledger + ?Sized + 'static,
{
    /// Create a vault for `wallet` on `ledger`.
    pub fn new(
        wallet: Wallet,
        ledger: Arc<L>,
        oracle: Arc<dyn PriceOracle>,
        config: VaultConfig,
    ) -> Result<Self> {
        let fee_wallet = Address::parse(&config.fees.fee_wallet)
            .map_err(|e| VaultError::Config(format!("fee wallet: {e}")))?;
        if wallet.modulus_bits() != config.modulus_bits {
            return Err(VaultError::Config(format!(
                "wallet has a {}-bit key, vault expects {} bits",
                wallet.modulus_bits(),
                config.modulus_bits
            )));
        }

        Ok(Self {
            resolver: HistoryResolver::new(Arc::clone(&ledger), config.resolver.clone()),
            codec: EnvelopeCodec::new(config.modulus_bits),
            wallet,
            ledger,
            oracle,
            fee_wallet,
            config,
        })
    }

    /// This wallet's address.
    pub fn address(&self) -> &Address {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn resolver(&self) -> &HistoryResolver<L> {
        &self.resolver
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a new credential under a freshly generated id.
    pub async fn create(&self, credential: &Credential) -> Result<(CredentialId, TxId)> {
        let fee = self.fee(FeeKind::Create).await?;
        self.ensure_funds(fee).await?;

        let id = CredentialId::generate();
        let envelope = self
            .codec
            .encrypt(credential, &self.wallet.encryption_key())?;

        let mut draft = self.draft(&id, Action::Create, envelope);
        if !fee.is_zero() {
            draft = draft.with_transfer(self.fee_wallet.clone(), fee);
        }
        let tx = self.submit(draft).await?;

        tracing::info!(%id, %tx, %fee, "created credential");
        Ok((id, tx))
    }

    /// Publish a new value for `id`. The site never changes.
    pub async fn edit(&self, id: &CredentialId, update: &CredentialUpdate) -> Result<TxId> {
        if update.is_empty() {
            return Err(VaultError::InvalidOperation(format!(
                "edit of {id} changes nothing"
            )));
        }

        let current = self.credential(id).await?;
        let edited = update.apply(&current.credential);
        let envelope = self.codec.encrypt(&edited, &self.wallet.encryption_key())?;
        let tx = self.submit(self.draft(id, Action::Edit, envelope)).await?;

        tracing::info!(%id, %tx, previous = %current.current.tx_id, "edited credential");
        Ok(tx)
    }

    /// Give `recipient` an independent copy of `id`, sealed to their key.
    ///
    /// The recipient must have published at least once so their key can be
    /// found. The share fee goes out as a separate `Share-Fee` transaction.
    pub async fn share(&self, id: &CredentialId, recipient: &Address) -> Result<TxId> {
        if recipient == self.address() {
            return Err(VaultError::InvalidOperation(
                "cannot share a credential with its owner".into(),
            ));
        }

        let recipient_key = self
            .deadline(encryption_key_for(&*self.ledger, recipient))
            .await??;
        let current = self.live(id).await?;
        let body = self.body(&current).await?;
        let envelope = self
            .codec
            .reseal(&body, self.wallet.decryption_key(), &recipient_key)?;

        let fee = self.fee(FeeKind::Share).await?;
        self.ensure_funds(fee).await?;
        if !fee.is_zero() {
            let payment = TransactionDraft::new(self.wallet.owner_key(), Bytes::new())
                .with_transfer(self.fee_wallet.clone(), fee)
                .with_tags(lifecycle_tags(self.app_name(), id, Action::ShareFee));
            let paid = self.submit(payment).await?;
            tracing::debug!(%id, tx = %paid, %fee, "paid share fee");
        }

        let draft = self.draft(id, Action::Share, envelope).with_target(recipient.clone());
        let tx = self.submit(draft).await?;

        tracing::info!(%id, %tx, %recipient, "shared credential");
        Ok(tx)
    }

    /// Tombstone `id` for this wallet. Terminal: the id never lists again.
    pub async fn remove(&self, id: &CredentialId) -> Result<TxId> {
        self.live(id).await?;

        let padding: String = {
            let mut rng = rand::thread_rng();
            (0..4).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
        };
        let tx = self
            .submit(self.draft(id, Action::Remove, padding.into_bytes()))
            .await?;

        tracing::info!(%id, %tx, "removed credential");
        Ok(tx)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every live credential of this wallet, decrypted.
    pub async fn credentials(&self) -> Result<Vec<StoredCredential>> {
        let live = self.resolver.list_live_credentials(self.address()).await?;
        let ids: Vec<CredentialId> = live.iter().map(|c| c.id.clone()).collect();
        let resolved = self.resolver.resolve_many(&ids, self.address()).await;

        let mut credentials = Vec::with_capacity(live.len());
        for (entry, current) in live.into_iter().zip(resolved) {
            let current = current?;
            let credential = self.open(&current).await?;
            credentials.push(StoredCredential {
                id: entry.id,
                shared: entry.is_shared,
                current,
                credential,
            });
        }
        Ok(credentials)
    }

    /// The current value of one credential.
    ///
    /// Removed credentials are reported as not found.
    pub async fn credential(&self, id: &CredentialId) -> Result<StoredCredential> {
        let current = self.live(id).await?;
        let shared = self.resolver.origin(id, self.address()).await? == Some(Origin::Shared);
        let credential = self.open(&current).await?;

        Ok(StoredCredential {
            id: id.clone(),
            shared,
            current,
            credential,
        })
    }

    /// Spendable balance of this wallet.
    pub async fn balance(&self) -> Result<Winston> {
        Ok(self.deadline(self.ledger.balance(self.address())).await??)
    }

    /// The fee the next operation of `kind` would cost.
    pub async fn fee(&self, kind: FeeKind) -> Result<Winston> {
        let prior_creates = match kind {
            FeeKind::Create => {
                let filter = EventFilter::created_by(self.address()).with_app_name(self.app_name());
                self.deadline(self.ledger.query_all_events(&filter))
                    .await??
                    .len()
            }
            FeeKind::Share => 0,
        };

        let usd = self.config.fees.usd_for(kind, prior_creates);
        if usd <= 0.0 {
            return Ok(Winston::ZERO);
        }
        let price = self.deadline(self.oracle.usd_per_ar()).await??;
        usd_to_winston(usd, price)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    fn app_name(&self) -> &str {
        &self.config.resolver.app_name
    }

    fn draft(&self, id: &CredentialId, action: Action, body: impl Into<Bytes>) -> TransactionDraft {
        TransactionDraft::new(self.wallet.owner_key(), body)
            .with_tags(lifecycle_tags(self.app_name(), id, action))
    }

    async fn submit(&self, draft: TransactionDraft) -> Result<TxId> {
        Ok(self.deadline(self.ledger.submit(draft)).await??)
    }

    async fn ensure_funds(&self, fee: Winston) -> Result<()> {
        if fee.is_zero() {
            return Ok(());
        }
        let available = self.balance().await?;
        if available < fee {
            return Err(VaultError::InsufficientFunds {
                required: fee,
                available,
            });
        }
        Ok(())
    }

    /// Resolve `id`, treating a removed credential as not found.
    async fn live(&self, id: &CredentialId) -> Result<CurrentEvent> {
        if self.resolver.is_removed(id, self.address()).await? {
            return Err(not_found(id, self.address()));
        }
        Ok(self.resolver.resolve_current(id, self.address()).await?)
    }

    async fn body(&self, current: &CurrentEvent) -> Result<Bytes> {
        self.deadline(self.ledger.fetch_body(&current.tx_id))
            .await??
            .ok_or(VaultError::MissingBody(current.tx_id))
    }

    /// Fetch and decrypt the body of a resolved event.
    async fn open(&self, current: &CurrentEvent) -> Result<Credential> {
        let body = self.body(current).await?;
        Ok(self.codec.decrypt(&body, self.wallet.decryption_key())?)
    }

    /// Bound a ledger call by the configured query timeout.
    async fn deadline<T>(&self, call: impl Future<Output = T>) -> Result<T> {
        let timeout = self.config.resolver.query_timeout;
        tokio::time::timeout(timeout, call).await.map_err(|_| {
            VaultError::Resolver(ResolverError::TransientNetwork(format!(
                "ledger call timed out after {timeout:?}"
            )))
        })
    }
}

fn not_found(id: &CredentialId, address: &Address) -> VaultError {
    VaultError::Resolver(ResolverError::CredentialNotFound {
        id: id.clone(),
        address: address.clone(),
    })
}
