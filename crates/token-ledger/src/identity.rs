use std::{fmt, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// 32-byte identity of a principal or a record.
///
/// The core only ever compares identities. Proving control of one (for
/// example by holding the matching ed25519 secret key) happens before a
/// request reaches the ledger.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identity([u8; 32]);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdentityError {
    #[error("invalid identity hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("identity must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl Identity {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive an identity from domain-separated seeds.
    ///
    /// Each seed is length-prefixed so that `["ab", "c"]` and `["a", "bc"]`
    /// never collide.
    pub fn derive(domain: &[u8], seeds: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"tledger-derive");
        hasher.update((domain.len() as u64).to_le_bytes());
        hasher.update(domain);
        for seed in seeds {
            hasher.update((seed.len() as u64).to_le_bytes());
            hasher.update(seed);
        }
        Self(hasher.finalize().into())
    }

    /// Identity of the associated balance record for `(owner, mint)`.
    pub fn associated_account(owner: &Identity, mint: &Identity) -> Self {
        Self::derive(
            b"associated-token-account",
            &[owner.as_bytes().as_slice(), mint.as_bytes().as_slice()],
        )
    }
}

impl From<[u8; 32]> for Identity {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(len))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

/// Hex encoding for raw 32-byte digests in serialized snapshots.
pub(crate) mod serde_digest {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("digest must be 32 bytes"))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(digest) => serializer.serialize_some(&hex::encode(digest)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
        where
            D: Deserializer<'de>,
        {
            use serde::de::Error;
            let encoded: Option<String> = Option::deserialize(deserializer)?;
            encoded
                .map(|s| {
                    let bytes = hex::decode(&s).map_err(D::Error::custom)?;
                    bytes
                        .try_into()
                        .map_err(|_| D::Error::custom("digest must be 32 bytes"))
                })
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_and_length_check() {
        let id = Identity::new([0xab; 32]);
        let parsed: Identity = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(
            "abcd".parse::<Identity>().unwrap_err(),
            IdentityError::InvalidLength(2)
        );
        assert!(matches!(
            "zz".parse::<Identity>().unwrap_err(),
            IdentityError::InvalidHex(_)
        ));
    }

    #[test]
    fn associated_identity_depends_on_both_seeds() {
        let owner = Identity::new([1u8; 32]);
        let mint_a = Identity::new([2u8; 32]);
        let mint_b = Identity::new([3u8; 32]);
        let a = Identity::associated_account(&owner, &mint_a);
        assert_eq!(a, Identity::associated_account(&owner, &mint_a));
        assert_ne!(a, Identity::associated_account(&owner, &mint_b));
        assert_ne!(a, Identity::associated_account(&mint_a, &owner));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = Identity::new([0x11; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
