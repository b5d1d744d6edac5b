//! The local wallet: an RSA keypair and the ledger address bound to it.
//!
//! Wallets are exchanged as RSA JSON Web Keys with base64url (unpadded)
//! big-endian fields.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use sera_core::Address;

use crate::crypto::{DecryptionKey, EncryptionKey};
use crate::error::{EnvelopeError, Result};

/// An RSA private key in JWK form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Jwk {
    pub kty: String,
    pub n: String,
    pub e: String,
    pub d: String,
    pub p: String,
    pub q: String,
    pub dp: String,
    pub dq: String,
    pub qi: String,
}

impl Jwk {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EnvelopeError::KeyFormat(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| EnvelopeError::Serialization(e.to_string()))
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("e", &self.e)
            .finish_non_exhaustive()
    }
}

/// The caller's own keypair.
#[derive(Clone)]
pub struct Wallet {
    key: DecryptionKey,
    address: Address,
}

impl Wallet {
    pub fn from_private_key(key: RsaPrivateKey) -> Self {
        let key = DecryptionKey::from_private_key(key);
        let address = key.encryption_key().address();
        Self { key, address }
    }

    /// Load a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let key = DecryptionKey::from_pkcs8_pem(pem)?;
        let address = key.encryption_key().address();
        Ok(Self { key, address })
    }

    /// Build the keypair from an RSA JWK.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "RSA" {
            return Err(EnvelopeError::KeyFormat(format!(
                "expected an RSA key, got kty {:?}",
                jwk.kty
            )));
        }

        let n = decode_uint("n", &jwk.n)?;
        let e = decode_uint("e", &jwk.e)?;
        let d = decode_uint("d", &jwk.d)?;
        let p = decode_uint("p", &jwk.p)?;
        let q = decode_uint("q", &jwk.q)?;

        let mut key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))?;
        key.validate()
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))?;
        key.precompute()
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))?;

        Ok(Self::from_private_key(key))
    }

    /// Export the keypair as an RSA JWK.
    pub fn to_jwk(&self) -> Result<Jwk> {
        let key = self.key.private_key();
        let [p, q] = key.primes() else {
            return Err(EnvelopeError::KeyFormat(
                "multi-prime keys have no JWK form".into(),
            ));
        };
        let missing = || EnvelopeError::KeyFormat("key has no CRT parameters".into());
        let dp = key.dp().ok_or_else(missing)?;
        let dq = key.dq().ok_or_else(missing)?;
        let qi = key.crt_coefficient().ok_or_else(missing)?;

        Ok(Jwk {
            kty: "RSA".to_owned(),
            n: encode_uint(key.n()),
            e: encode_uint(key.e()),
            d: encode_uint(key.d()),
            p: encode_uint(p),
            q: encode_uint(q),
            dp: encode_uint(dp),
            dq: encode_uint(dq),
            qi: encode_uint(&qi),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The modulus, as carried in the owner field of every transaction.
    pub fn owner_key(&self) -> Vec<u8> {
        self.key.encryption_key().owner_key()
    }

    pub fn modulus_bits(&self) -> usize {
        self.key.encryption_key().modulus_bits()
    }

    /// Encrypt-only handle for sealing to this wallet.
    pub fn encryption_key(&self) -> EncryptionKey {
        self.key.encryption_key()
    }

    /// Decrypt-only handle for opening envelopes sealed to this wallet.
    pub fn decryption_key(&self) -> &DecryptionKey {
        &self.key
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn decode_uint(field: &str, value: &str) -> Result<BigUint> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| EnvelopeError::KeyFormat(format!("JWK field {field}: {e}")))?;
    if bytes.is_empty() {
        return Err(EnvelopeError::KeyFormat(format!("JWK field {field} is empty")));
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

fn encode_uint(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}
