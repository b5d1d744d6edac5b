//! Strong type definitions for Sera.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Number of winston in one AR.
pub const WINSTON_PER_AR: u128 = 1_000_000_000_000;

/// A ledger address.
///
/// Computed as base64url(SHA-256(owner modulus)), so it is always 43
/// characters of URL-safe base64 without padding.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Length of an encoded address.
    pub const ENCODED_LEN: usize = 43;

    /// Derive the address bound to an owner's public modulus.
    pub fn from_owner_key(owner_key: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(Sha256::digest(owner_key)))
    }

    /// Parse an encoded address.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CoreError::InvalidAddress(format!("{s}: {e}")))?;
        if bytes.len() != 32 {
            return Err(CoreError::InvalidAddress(format!(
                "{s}: expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(s.to_owned()))
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// A 32-byte transaction identifier.
///
/// Rendered as 43 characters of unpadded base64url, the form ledger
/// gateways use in URLs and query results.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as unpadded base64url.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Parse from unpadded base64url.
    pub fn from_base64url(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CoreError::InvalidTxId(format!("{s}: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidTxId(format!("{s}: expected 32 bytes")))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.to_base64url()[..12])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64url())
    }
}

impl From<[u8; 32]> for TxId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for TxId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Opaque identifier of a credential, carried in the `ID` tag.
///
/// Unique only within one owning address: the same string under another
/// address names an unrelated credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialId(String);

const ID_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

impl CredentialId {
    /// Length of generated identifiers.
    pub const GENERATED_LEN: usize = 21;

    /// Wrap a caller-chosen identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidCredentialId("empty".into()));
        }
        Ok(Self(id))
    }

    /// Generate a fresh random URL-safe identifier.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..Self::GENERATED_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CredentialId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CredentialId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<CredentialId> for String {
    fn from(id: CredentialId) -> Self {
        id.0
    }
}

/// An amount of the ledger's native token, in winston.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Winston(pub u128);

impl Winston {
    pub const ZERO: Self = Self(0);

    /// Convert an AR amount, rounding to the nearest winston.
    ///
    /// Negative and non-finite inputs convert to zero.
    pub fn from_ar(ar: f64) -> Self {
        if !ar.is_finite() || ar <= 0.0 {
            return Self::ZERO;
        }
        Self((ar * WINSTON_PER_AR as f64).round() as u128)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Winston {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} winston", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_owner_key() {
        let address = Address::from_owner_key(&[0x42; 512]);
        assert_eq!(address.as_str().len(), Address::ENCODED_LEN);

        let parsed = Address::parse(address.as_str()).unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!(Address::parse("abc").is_err());
        assert!(Address::parse("not base64 !!").is_err());
    }

    #[test]
    fn test_tx_id_base64url_roundtrip() {
        let id = TxId::from_bytes([0xfb; 32]);
        let encoded = id.to_base64url();
        assert_eq!(encoded.len(), 43);
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(TxId::from_base64url(&encoded).unwrap(), id);
    }

    #[test]
    fn test_tx_id_debug() {
        let id = TxId::from_bytes([0xcd; 32]);
        assert!(format!("{:?}", id).starts_with("TxId("));
    }

    #[test]
    fn test_generated_credential_ids() {
        let a = CredentialId::generate();
        let b = CredentialId::generate();

        assert_eq!(a.as_str().len(), CredentialId::GENERATED_LEN);
        assert!(a
            .as_str()
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-'));
        assert_ne!(a, b);
    }

    #[test]
    fn test_credential_id_validation() {
        assert!(CredentialId::new("").is_err());
        assert_eq!(CredentialId::new("x".repeat(300)).unwrap().as_str().len(), 300);
        assert_eq!(CredentialId::new("x1").unwrap().as_str(), "x1");
    }

    #[test]
    fn test_winston_conversion() {
        assert_eq!(Winston::from_ar(1.0), Winston(WINSTON_PER_AR));
        assert_eq!(Winston::from_ar(0.0125), Winston(12_500_000_000));
        assert_eq!(Winston::from_ar(-3.0), Winston::ZERO);
        assert_eq!(Winston::from_ar(f64::NAN), Winston::ZERO);
    }
}
