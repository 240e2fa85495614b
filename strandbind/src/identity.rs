// Identity: a DNS-style peer name (e.g. "alice.example").

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrandBindError};

/// Maximum encoded length of a name, as in DNS.
pub const MAX_IDENTITY_LEN: usize = 253;

const MAX_LABEL_LEN: usize = 63;

/// An opaque, validated domain/peer name.
///
/// Names are normalised to lowercase on construction, so two identities
/// compare equal exactly when their DNS names match case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Validate and normalise a name.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().to_ascii_lowercase();
        if name.is_empty() || name.len() > MAX_IDENTITY_LEN {
            return Err(StrandBindError::InvalidIdentity(format!(
                "length {} outside 1..={MAX_IDENTITY_LEN}",
                name.len()
            )));
        }
        for label in name.split('.') {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(StrandBindError::InvalidIdentity(format!(
                    "bad label length in {name:?}"
                )));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(StrandBindError::InvalidIdentity(format!(
                    "label {label:?} starts or ends with a hyphen"
                )));
            }
            if !label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
            {
                return Err(StrandBindError::InvalidIdentity(format!(
                    "label {label:?} has characters outside [a-z0-9-]"
                )));
            }
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = StrandBindError;

    fn from_str(s: &str) -> Result<Self> {
        Identity::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = StrandBindError;

    fn try_from(value: String) -> Result<Self> {
        Identity::new(value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_case() {
        let a = Identity::new("Alice.Example").unwrap();
        let b: Identity = "alice.example".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "alice.example");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", "a..b", "-a.example", "a-.example", "a_b.example", "a b"] {
            assert!(Identity::new(bad).is_err(), "{bad:?} should be rejected");
        }
        let long_label = "x".repeat(64);
        assert!(Identity::new(format!("{long_label}.example")).is_err());
    }

    #[test]
    fn serde_uses_plain_string() {
        let id = Identity::new("bob.example").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bob.example\"");
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<Identity>("\"bad name\"").is_err());
    }
}
