//! # Principals
//!
//! An [`Address`] names a party that can deposit into, withdraw from, or
//! receive value from a Locked Wallet. The ledger does no authentication
//! of its own: the host environment vouches for the caller, and the ledger
//! only compares the claimed caller against its fixed owner.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque principal identifier (account address, public key hex, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_identifier() {
        assert_eq!(Address::from("owner"), Address::new(String::from("owner")));
        assert_ne!(Address::from("owner"), Address::from("Owner"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Address::from("0xabc")).unwrap();
        assert_eq!(json, r#""0xabc""#);
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "0xabc");
    }
}
