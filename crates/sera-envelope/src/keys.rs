//! Recipient key lookup through the ledger's key directory.

use sera_core::Address;
use sera_ledger::KeyDirectory;

use crate::crypto::EncryptionKey;
use crate::error::{EnvelopeError, Result};

/// Resolve the encrypt-only key of `address` from its most recent ledger record.
///
/// Fails with [`EnvelopeError::KeyNotFound`] when the address has never
/// published, and with [`EnvelopeError::KeyFormat`] when the published key
/// does not hash to the address.
pub async fn encryption_key_for<D>(directory: &D, address: &Address) -> Result<EncryptionKey>
where
    D: KeyDirectory + ?Sized,
{
    let owner_key = directory
        .lookup_owner_key(address)
        .await?
        .ok_or_else(|| EnvelopeError::KeyNotFound(address.to_string()))?;

    let key = EncryptionKey::from_owner_key(&owner_key)?;
    if key.address() != *address {
        tracing::warn!(%address, "published owner key does not match address");
        return Err(EnvelopeError::KeyFormat(format!(
            "owner key published for {address} belongs to another address"
        )));
    }
    Ok(key)
}
