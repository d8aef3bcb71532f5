//! Transaction and output identifiers
//!
//! A [`Txid`] is held in display byte order (the order of its usual hex
//! rendering). [`UtxoReference`] pairs it with an output index and is the
//! key used throughout the overlay.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::OutpointError;

/// A 32-byte ledger transaction identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Txid([u8; 32]);

impl Txid {
    /// Length in bytes
    pub const LEN: usize = 32;

    /// Create from display-order bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64 character hex string (either case)
    pub fn from_hex(s: &str) -> Result<Self, OutpointError> {
        let bytes = hex::decode(s).map_err(|e| OutpointError::InvalidTxid(format!("{s}: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            OutpointError::InvalidTxid(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Create from the byte order used inside serialized transactions
    pub fn from_wire_bytes(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Bytes in the order used inside serialized transactions
    pub fn to_wire_bytes(&self) -> [u8; 32] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    /// Get the display-order bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lower-case hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", self.to_hex())
    }
}

impl FromStr for Txid {
    type Err = OutpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Txid::from_hex(&s).map_err(de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Txid)
        }
    }
}

/// Reference to a single transaction output
///
/// Serializes as `{"txid": "<hex>", "outputIndex": n}`, the shape returned
/// by lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoReference {
    pub txid: Txid,
    pub output_index: u32,
}

impl UtxoReference {
    /// Length of the fixed-size storage key
    pub const KEY_LEN: usize = Txid::LEN + 4;

    pub fn new(txid: Txid, output_index: u32) -> Self {
        Self { txid, output_index }
    }

    /// Fixed-size storage key: txid bytes followed by the big-endian index
    ///
    /// Big-endian keeps keys for one transaction ordered by output index.
    pub fn to_key_bytes(&self) -> [u8; Self::KEY_LEN] {
        let mut key = [0u8; Self::KEY_LEN];
        key[..Txid::LEN].copy_from_slice(self.txid.as_bytes());
        key[Txid::LEN..].copy_from_slice(&self.output_index.to_be_bytes());
        key
    }

    /// Inverse of [`to_key_bytes`](Self::to_key_bytes)
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, OutpointError> {
        if bytes.len() != Self::KEY_LEN {
            return Err(OutpointError::InvalidOutpoint(format!(
                "key must be {} bytes, got {}",
                Self::KEY_LEN,
                bytes.len()
            )));
        }
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes[..Txid::LEN]);
        let mut index = [0u8; 4];
        index.copy_from_slice(&bytes[Txid::LEN..]);
        Ok(Self {
            txid: Txid(txid),
            output_index: u32::from_be_bytes(index),
        })
    }
}

impl Display for UtxoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.output_index)
    }
}

impl FromStr for UtxoReference {
    type Err = OutpointError;

    /// Parse the `txid.index` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .split_once('.')
            .ok_or_else(|| OutpointError::InvalidOutpoint(format!("missing '.' in {s}")))?;
        let output_index = index
            .parse()
            .map_err(|e| OutpointError::InvalidOutpoint(format!("{index}: {e}")))?;
        Ok(Self {
            txid: txid.parse()?,
            output_index,
        })
    }
}
