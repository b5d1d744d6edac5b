//! The envelope codec.
//!
//! An envelope is a single binary blob:
//!
//! ```text
//! offset 0              : RSA-OAEP/SHA-256 ciphertext of the 256-byte secret
//!                         (modulus byte length, 512 for 4096-bit keys)
//! offset key_segment_len: ChaCha20-Poly1305 ciphertext of the canonical
//!                         credential encoding, tag included
//! ```
//!
//! No framing, version byte or length prefix. The boundary is fixed by the
//! modulus size the codec is configured for.

use zeroize::Zeroize;

use sera_core::Credential;

use crate::crypto::{DecryptionKey, EncryptionKey, SymmetricSecret, TAG_LEN};
use crate::error::{EnvelopeError, Result};

/// Modulus size of ledger wallets.
pub const DEFAULT_MODULUS_BITS: usize = 4096;

/// Smallest modulus whose OAEP/SHA-256 capacity fits the 256-byte secret.
pub const MIN_MODULUS_BITS: usize = 3072;

/// Seals credentials for a recipient key and opens them again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeCodec {
    modulus_bits: usize,
}

impl EnvelopeCodec {
    /// A codec for keys of the given modulus size.
    pub const fn new(modulus_bits: usize) -> Self {
        Self { modulus_bits }
    }

    pub const fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    /// Length of the wrapped-secret segment at the head of every envelope.
    pub const fn key_segment_len(&self) -> usize {
        (self.modulus_bits + 7) / 8
    }

    /// Total envelope length for a canonical encoding of `plaintext_len` bytes.
    pub const fn envelope_len(&self, plaintext_len: usize) -> usize {
        self.key_segment_len() + plaintext_len + TAG_LEN
    }

    fn check_key_len(&self, len: usize) -> Result<()> {
        if self.modulus_bits < MIN_MODULUS_BITS {
            return Err(EnvelopeError::KeyFormat(format!(
                "{}-bit keys cannot carry a 256-byte secret",
                self.modulus_bits
            )));
        }
        if len != self.key_segment_len() {
            return Err(EnvelopeError::KeyFormat(format!(
                "expected a {}-bit key, got {} bits",
                self.modulus_bits,
                len * 8
            )));
        }
        Ok(())
    }

    /// Seal a credential so only the holder of `recipient`'s private key can open it.
    pub fn encrypt(&self, credential: &Credential, recipient: &EncryptionKey) -> Result<Vec<u8>> {
        self.check_key_len(recipient.ciphertext_len())?;

        let mut plaintext = credential
            .to_canonical_bytes()
            .map_err(|e| EnvelopeError::Serialization(e.to_string()))?;

        let secret = SymmetricSecret::generate();
        let sealed = secret.content_cipher().encrypt(&plaintext);
        plaintext.zeroize();
        let sealed = sealed?;

        let mut envelope = recipient.wrap(&secret)?;
        envelope.reserve(sealed.len());
        envelope.extend_from_slice(&sealed);
        Ok(envelope)
    }

    /// Open an envelope with the recipient's private key.
    pub fn decrypt(&self, envelope: &[u8], key: &DecryptionKey) -> Result<Credential> {
        self.check_key_len(key.ciphertext_len())?;

        let boundary = self.key_segment_len();
        if envelope.len() < boundary + TAG_LEN {
            return Err(EnvelopeError::Decryption);
        }
        let (wrapped, sealed) = envelope.split_at(boundary);

        let secret = key.unwrap_secret(wrapped)?;
        let mut plaintext = secret.content_cipher().decrypt(sealed)?;
        let credential = Credential::from_canonical_bytes(&plaintext)
            .map_err(|e| EnvelopeError::Serialization(e.to_string()));
        plaintext.zeroize();
        credential
    }

    /// Open an envelope and seal its credential again for another recipient.
    pub fn reseal(
        &self,
        envelope: &[u8],
        key: &DecryptionKey,
        recipient: &EncryptionKey,
    ) -> Result<Vec<u8>> {
        let credential = self.decrypt(envelope, key)?;
        self.encrypt(&credential, recipient)
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MODULUS_BITS)
    }
}
