//! Ledger block structure.
//!
//! A block's own hash is never stored; it is recomputed from the canonical
//! JSON form whenever it is needed.

use crate::canonical::to_canonical_json;
use crate::record::Record;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// A SHA-256 block digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    /// Length of the hex rendering.
    pub const HEX_LEN: usize = 64;

    /// Creates a block hash from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hashes arbitrary bytes.
    pub fn digest(data: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data.as_ref());
        Self(hasher.finalize().into())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64 character lowercase hex string.
    ///
    /// Uppercase input is rejected: a peer's link must re-serialize to the
    /// exact text it was hashed from.
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        if hex_str.len() != Self::HEX_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        if let Some((index, c)) = hex_str
            .char_indices()
            .find(|(_, c)| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(hex::FromHexError::InvalidHexCharacter { c, index });
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Link from a block to its predecessor.
///
/// The genesis block links to a fixed sentinel, serialized as the JSON
/// integer `1`. A real link is always a 64 character hex string, so the two
/// can never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockLink {
    /// The genesis sentinel.
    Genesis,
    /// Digest of the previous block.
    Hash(BlockHash),
}

impl BlockLink {
    /// Wire value of the genesis sentinel.
    pub const GENESIS_SENTINEL: u64 = 1;

    /// Returns true for the genesis sentinel.
    pub fn is_genesis(&self) -> bool {
        matches!(self, Self::Genesis)
    }

    /// Returns the linked digest, if any.
    pub fn hash(&self) -> Option<BlockHash> {
        match self {
            Self::Genesis => None,
            Self::Hash(hash) => Some(*hash),
        }
    }
}

impl From<BlockHash> for BlockLink {
    fn from(hash: BlockHash) -> Self {
        Self::Hash(hash)
    }
}

impl std::fmt::Display for BlockLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Genesis => write!(f, "{}", Self::GENESIS_SENTINEL),
            Self::Hash(hash) => write!(f, "{hash}"),
        }
    }
}

impl Serialize for BlockLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Genesis => serializer.serialize_u64(Self::GENESIS_SENTINEL),
            Self::Hash(hash) => hash.serialize(serializer),
        }
    }
}

struct BlockLinkVisitor;

impl Visitor<'_> for BlockLinkVisitor {
    type Value = BlockLink;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "the genesis sentinel {} or a 64 character hex digest",
            BlockLink::GENESIS_SENTINEL
        )
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<BlockLink, E> {
        if v == BlockLink::GENESIS_SENTINEL {
            Ok(BlockLink::Genesis)
        } else {
            Err(E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<BlockLink, E> {
        match u64::try_from(v) {
            Ok(v) => self.visit_u64(v),
            Err(_) => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<BlockLink, E> {
        BlockHash::from_hex(v)
            .map(BlockLink::Hash)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for BlockLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BlockLinkVisitor)
    }
}

/// Block creation time in seconds since the UNIX epoch.
///
/// Keeps the integer or float form it arrived in, since `1700000000` and
/// `1700000000.0` hash differently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Whole seconds, as sent by peers that emit integers.
    Seconds(i64),
    /// Fractional seconds, as stamped by this node.
    Fractional(f64),
}

impl Timestamp {
    /// Returns the time as fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        match *self {
            Self::Seconds(secs) => secs as f64,
            Self::Fractional(secs) => secs,
        }
    }
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        Self::Fractional(secs)
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self::Seconds(secs)
    }
}

/// A block of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 1 for genesis.
    pub index: u64,

    /// Creation time.
    pub timestamp: Timestamp,

    /// Records in submission order.
    pub transactions: Vec<Record>,

    /// Proof-of-work nonce, valid relative to the previous block's proof.
    pub proof: u64,

    /// Link to the previous block.
    pub previous_hash: BlockLink,
}

impl Block {
    /// Proof carried by every genesis block.
    pub const GENESIS_PROOF: u64 = 100;

    /// Creates a new block.
    pub fn new(
        index: u64,
        timestamp: impl Into<Timestamp>,
        transactions: Vec<Record>,
        proof: u64,
        previous_hash: BlockLink,
    ) -> Self {
        Self {
            index,
            timestamp: timestamp.into(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Creates the genesis block.
    pub fn genesis(timestamp: impl Into<Timestamp>) -> Self {
        Self::new(
            1,
            timestamp,
            Vec::new(),
            Self::GENESIS_PROOF,
            BlockLink::Genesis,
        )
    }

    /// Returns the canonical JSON form hashed by [`Block::hash`].
    pub fn canonical_json(&self) -> String {
        // Every field serializes to a string-keyed JSON value, and serde_json
        // renders non-finite floats as null rather than failing.
        to_canonical_json(self).expect("block serialization should not fail")
    }

    /// Computes the block hash.
    pub fn hash(&self) -> BlockHash {
        BlockHash::digest(self.canonical_json())
    }

    /// Returns the number of records.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

/// Current time in seconds since the UNIX epoch.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
