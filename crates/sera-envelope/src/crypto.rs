//! Cryptographic primitives for envelopes.
//!
//! Provides RSA-OAEP/SHA-256 key handles for wrapping the symmetric secret and
//! ChaCha20-Poly1305 for the content itself.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use sera_core::Address;

use crate::error::{EnvelopeError, Result};

/// Length of the symmetric secret carried in every envelope.
pub const SECRET_LEN: usize = 256;

/// Public exponent assumed for every owner key (`AQAB`).
pub const PUBLIC_EXPONENT: u32 = 65537;

/// Poly1305 tag appended to the content ciphertext.
pub const TAG_LEN: usize = 16;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// An encrypt-only RSA handle bound to OAEP/SHA-256.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(RsaPublicKey);

impl EncryptionKey {
    /// Build from a published owner key (the big-endian RSA modulus).
    pub fn from_owner_key(owner_key: &[u8]) -> Result<Self> {
        if owner_key.iter().all(|&b| b == 0) {
            return Err(EnvelopeError::KeyFormat("empty modulus".into()));
        }
        let n = BigUint::from_bytes_be(owner_key);
        RsaPublicKey::new(n, BigUint::from(PUBLIC_EXPONENT))
            .map(Self)
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))
    }

    /// Size of the modulus in bits.
    pub fn modulus_bits(&self) -> usize {
        self.0.n().bits()
    }

    /// Length of every OAEP ciphertext produced with this key.
    pub fn ciphertext_len(&self) -> usize {
        self.0.size()
    }

    /// The modulus as published on the ledger.
    pub fn owner_key(&self) -> Vec<u8> {
        self.0.n().to_bytes_be()
    }

    /// The ledger address bound to this key.
    pub fn address(&self) -> Address {
        Address::from_owner_key(&self.owner_key())
    }

    pub(crate) fn wrap(&self, secret: &SymmetricSecret) -> Result<Vec<u8>> {
        self.0
            .encrypt(&mut rand::thread_rng(), oaep(), secret.as_bytes())
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bits", &self.modulus_bits())
            .field("address", &self.address())
            .finish()
    }
}

/// A decrypt-only RSA handle with the same algorithm parameters.
///
/// The underlying private key zeroizes itself on drop.
#[derive(Clone)]
pub struct DecryptionKey(RsaPrivateKey);

impl DecryptionKey {
    pub fn from_private_key(key: RsaPrivateKey) -> Self {
        Self(key)
    }

    /// Parse a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .map(Self)
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))
    }

    /// The matching encrypt-only handle.
    pub fn encryption_key(&self) -> EncryptionKey {
        EncryptionKey(self.0.to_public_key())
    }

    /// Length of the OAEP ciphertexts this key opens.
    pub fn ciphertext_len(&self) -> usize {
        self.0.size()
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.0
    }

    pub(crate) fn unwrap_secret(&self, segment: &[u8]) -> Result<SymmetricSecret> {
        let mut bytes = self
            .0
            .decrypt(oaep(), segment)
            .map_err(|_| EnvelopeError::Decryption)?;
        let secret = SymmetricSecret::from_slice(&bytes);
        bytes.zeroize();
        secret
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKey")
            .field("bits", &self.0.n().bits())
            .finish_non_exhaustive()
    }
}

/// The 256-byte per-envelope secret.
///
/// Only its derived content key and nonce are fed to the cipher.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricSecret([u8; SECRET_LEN]);

impl SymmetricSecret {
    /// Generate a fresh secret from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Recover a secret from unwrapped bytes. Any other length is a failed decryption.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SECRET_LEN] = bytes.try_into().map_err(|_| EnvelopeError::Decryption)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }

    /// Derive the content cipher for this secret.
    pub fn content_cipher(&self) -> ContentCipher {
        let mut okm = [0u8; 44];
        let mut hasher = blake3::Hasher::new_derive_key("sera-envelope-v1 content key");
        hasher.update(&self.0);
        hasher.finalize_xof().fill(&mut okm);

        let mut cipher = ContentCipher {
            key: [0u8; 32],
            nonce: [0u8; 12],
        };
        cipher.key.copy_from_slice(&okm[..32]);
        cipher.nonce.copy_from_slice(&okm[32..]);
        okm.zeroize();
        cipher
    }
}

/// ChaCha20-Poly1305 key and nonce derived from a [`SymmetricSecret`].
///
/// Each secret is used for exactly one message, so the fixed nonce never repeats
/// under the same key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ContentCipher {
    key: [u8; 32],
    nonce: [u8; 12],
}

impl ContentCipher {
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))?;
        cipher
            .encrypt(Nonce::from_slice(&self.nonce), plaintext)
            .map_err(|_| EnvelopeError::Serialization("content too large to encrypt".into()))
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let cipher =
            ChaCha20Poly1305::new_from_slice(&self.key).map_err(|_| EnvelopeError::Decryption)?;
        cipher
            .decrypt(Nonce::from_slice(&self.nonce), ciphertext)
            .map_err(|_| EnvelopeError::Decryption)
    }
}
