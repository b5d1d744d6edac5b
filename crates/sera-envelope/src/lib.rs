//! # Sera Envelope
//!
//! Hybrid encryption of credentials for a single recipient.
//!
//! ## Overview
//!
//! Every credential stored on the ledger is sealed into an envelope:
//!
//! 1. **Symmetric secret**: 256 fresh random bytes per envelope. A
//!    ChaCha20-Poly1305 key and nonce are derived from it with BLAKE3.
//! 2. **Key segment**: the secret, encrypted to the recipient's RSA key with
//!    OAEP/SHA-256. Its length equals the modulus byte length.
//!
//! The envelope is the key segment followed directly by the content
//! ciphertext. Opening needs the recipient's private key only.
//!
//! Recipient keys come from the ledger's key directory
//! ([`encryption_key_for`]); the local keypair comes from a [`Wallet`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sera_core::Credential;
//! use sera_envelope::{EnvelopeCodec, Wallet};
//!
//! # fn main() -> sera_envelope::Result<()> {
//! # let pem = "";
//! let wallet = Wallet::from_pkcs8_pem(pem)?;
//! let codec = EnvelopeCodec::default();
//!
//! let credential = Credential::new("example.com", "user", "hunter2");
//! let envelope = codec.encrypt(&credential, &wallet.encryption_key())?;
//! let opened = codec.decrypt(&envelope, wallet.decryption_key())?;
//! assert_eq!(opened, credential);
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod wallet;

pub use crypto::{
    ContentCipher, DecryptionKey, EncryptionKey, SymmetricSecret, PUBLIC_EXPONENT, SECRET_LEN,
    TAG_LEN,
};
pub use envelope::{EnvelopeCodec, DEFAULT_MODULUS_BITS, MIN_MODULUS_BITS};
pub use error::{EnvelopeError, Result};
pub use keys::encryption_key_for;
pub use wallet::{Jwk, Wallet};
