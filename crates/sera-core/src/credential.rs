//! The structured secret carried inside an envelope.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// A stored login: site, username, password.
///
/// Field order is part of the canonical encoding and must not change.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub site: String,
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(
        site: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Encode as compact JSON with fields in declaration order.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Decode from the canonical encoding.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("site", &self.site)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A partial update applied by an edit. The site is never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialUpdate {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: Some(password.into()),
        }
    }

    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }

    /// Produce the edited credential; absent fields keep their current value.
    pub fn apply(&self, current: &Credential) -> Credential {
        Credential {
            site: current.site.clone(),
            username: self
                .username
                .clone()
                .unwrap_or_else(|| current.username.clone()),
            password: self
                .password
                .clone()
                .unwrap_or_else(|| current.password.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_field_order() {
        let credential = Credential::new("ex.com", "u", "p");
        let bytes = credential.to_canonical_bytes().unwrap();

        assert_eq!(
            bytes,
            br#"{"site":"ex.com","username":"u","password":"p"}"#.to_vec()
        );
    }

    #[test]
    fn test_malformed_bytes_rejected() {
        assert!(matches!(
            Credential::from_canonical_bytes(b"{\"site\":1}"),
            Err(CoreError::Serialization(_))
        ));
        assert!(Credential::from_canonical_bytes(&[0xff, 0x00]).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let credential = Credential::new("ex.com", "u", "hunter2");
        let debug = format!("{:?}", credential);

        assert!(debug.contains("ex.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_update_keeps_site_and_absent_fields() {
        let current = Credential::new("ex.com", "u", "p");

        let edited = CredentialUpdate::password("p2").apply(&current);
        assert_eq!(edited, Credential::new("ex.com", "u", "p2"));

        let edited = CredentialUpdate::username("v").apply(&current);
        assert_eq!(edited, Credential::new("ex.com", "v", "p"));

        assert!(CredentialUpdate::default().is_empty());
        assert_eq!(CredentialUpdate::default().apply(&current), current);
    }

    proptest! {
        #[test]
        fn test_canonical_encoding_is_stable(
            site in ".{0,40}",
            username in ".{0,40}",
            password in ".{0,40}",
        ) {
            let credential = Credential::new(site, username, password);
            let bytes = credential.to_canonical_bytes().unwrap();

            prop_assert_eq!(Credential::from_canonical_bytes(&bytes).unwrap(), credential.clone());
            prop_assert_eq!(credential.to_canonical_bytes().unwrap(), bytes);
        }
    }
}
