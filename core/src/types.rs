//! Core types for RelayVote
//!
//! Defines fundamental data structures used across the system.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 32-byte value shown as hex.
///
/// Human-readable formats carry a hex string; binary formats carry the raw
/// array so stored records stay fixed-width.
macro_rules! bytes32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const ZERO: $name = $name([0u8; 32]);

            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                $name(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse 64 hex digits, with or without a `0x` prefix
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut arr = [0u8; 32];
                hex::decode_to_slice(s.trim_start_matches("0x"), &mut arr)?;
                Ok($name(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", &self.to_hex()[..16])
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    $name::from_hex(&s).map_err(de::Error::custom)
                } else {
                    <[u8; 32]>::deserialize(deserializer).map($name)
                }
            }
        }
    };
}

bytes32! {
    /// Principal address derived from a public key hash
    Address
}

bytes32! {
    /// BLAKE3 digest
    Hash
}

/// 32-byte public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(0x{})", self.to_hex())
    }
}

/// Ledger height at which a call executes
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Height(pub u64);

impl Height {
    pub fn new(value: u64) -> Self {
        Height(value)
    }

    pub fn next(&self) -> Height {
        Height(self.0.saturating_add(1))
    }

    /// Height reached after `blocks` more blocks, saturating at `u64::MAX`
    pub fn saturating_add(&self, blocks: u64) -> Height {
        Height(self.0.saturating_add(blocks))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Height({})", self.0)
    }
}

/// Timestamp in milliseconds since Unix epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(chrono::Utc::now().timestamp_millis() as u64)
    }

    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Store version, bumped on every applied batch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct StateVersion(pub u64);

impl StateVersion {
    pub fn new(value: u64) -> Self {
        StateVersion(value)
    }

    pub fn next(&self) -> StateVersion {
        StateVersion(self.0 + 1)
    }
}

impl fmt::Display for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Debug for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateVersion({})", self.0)
    }
}

/// Proposal ID (digest of proposal content)
pub type ProposalId = Hash;

/// State root hash
pub type StateRoot = Hash;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex() {
        let addr = Address([1u8; 32]);
        let hex = addr.to_hex();
        let parsed = Address::from_hex(&hex).unwrap();
        assert_eq!(addr, parsed);

        let prefixed = Address::from_hex(&format!("0x{}", hex)).unwrap();
        assert_eq!(addr, prefixed);
    }

    #[test]
    fn test_address_rejects_short_hex() {
        assert!(Address::from_hex("abcd").is_err());
        assert!(Hash::from_hex("zz").is_err());
    }

    #[test]
    fn test_hex_serde_human_readable() {
        let addr = Address([7u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);

        let bytes = bincode::serialize(&addr).unwrap();
        assert_eq!(bytes.len(), 32);
        let back: Address = bincode::deserialize(&bytes).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn test_state_version_formatting() {
        let version = StateVersion::new(4).next();
        assert_eq!(version, StateVersion::new(5));
        assert_eq!(format!("{}", version), "v5");
        assert_eq!(format!("{:?}", version), "StateVersion(5)");
    }

    #[test]
    fn test_height_saturates() {
        assert_eq!(Height::new(5).next(), Height::new(6));
        assert_eq!(Height::new(u64::MAX).saturating_add(10), Height::new(u64::MAX));
    }
}
