//! Events the overlay runtime delivers to lookup services
//!
//! A lookup service declares which admission and spend payload modes it
//! wants; the runtime then delivers events in that shape.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::outpoint::{Txid, UtxoReference};

/// What an admission event carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdmissionMode {
    /// The admitted output's locking script
    LockingScript,
    /// The whole transaction as Atomic BEEF
    WholeTx,
}

/// What a spend event carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpendNotificationMode {
    /// Only the spent outpoint
    None,
    /// The spending transaction id
    Txid,
    /// The spending input's unlocking script
    Script,
    /// The whole spending transaction
    WholeTx,
}

impl AdmissionMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LockingScript => "locking-script",
            Self::WholeTx => "whole-tx",
        }
    }
}

impl Display for AdmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SpendNotificationMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Txid => "txid",
            Self::Script => "script",
            Self::WholeTx => "whole-tx",
        }
    }
}

impl Display for SpendNotificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An output was admitted to a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputAdmittedByTopic {
    LockingScript {
        topic: String,
        outpoint: UtxoReference,
        satoshis: u64,
        locking_script: Vec<u8>,
    },
    WholeTx {
        topic: String,
        outpoint: UtxoReference,
        atomic_beef: Vec<u8>,
    },
}

impl OutputAdmittedByTopic {
    /// Convenience constructor for the locking-script mode
    pub fn locking_script(
        topic: impl Into<String>,
        outpoint: UtxoReference,
        locking_script: Vec<u8>,
    ) -> Self {
        Self::LockingScript {
            topic: topic.into(),
            outpoint,
            satoshis: 1,
            locking_script,
        }
    }

    pub fn mode(&self) -> AdmissionMode {
        match self {
            Self::LockingScript { .. } => AdmissionMode::LockingScript,
            Self::WholeTx { .. } => AdmissionMode::WholeTx,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Self::LockingScript { topic, .. } | Self::WholeTx { topic, .. } => topic,
        }
    }

    pub fn outpoint(&self) -> UtxoReference {
        match self {
            Self::LockingScript { outpoint, .. } | Self::WholeTx { outpoint, .. } => *outpoint,
        }
    }
}

/// A previously admitted output was spent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpent {
    None {
        topic: String,
        outpoint: UtxoReference,
    },
    Txid {
        topic: String,
        outpoint: UtxoReference,
        spending_txid: Txid,
    },
    Script {
        topic: String,
        outpoint: UtxoReference,
        spending_txid: Txid,
        input_index: u32,
        unlocking_script: Vec<u8>,
        sequence_number: u32,
    },
    WholeTx {
        topic: String,
        outpoint: UtxoReference,
        spending_atomic_beef: Vec<u8>,
    },
}

impl OutputSpent {
    /// Convenience constructor for the outpoint-only mode
    pub fn outpoint_only(topic: impl Into<String>, outpoint: UtxoReference) -> Self {
        Self::None {
            topic: topic.into(),
            outpoint,
        }
    }

    pub fn mode(&self) -> SpendNotificationMode {
        match self {
            Self::None { .. } => SpendNotificationMode::None,
            Self::Txid { .. } => SpendNotificationMode::Txid,
            Self::Script { .. } => SpendNotificationMode::Script,
            Self::WholeTx { .. } => SpendNotificationMode::WholeTx,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Self::None { topic, .. }
            | Self::Txid { topic, .. }
            | Self::Script { topic, .. }
            | Self::WholeTx { topic, .. } => topic,
        }
    }

    pub fn outpoint(&self) -> UtxoReference {
        match self {
            Self::None { outpoint, .. }
            | Self::Txid { outpoint, .. }
            | Self::Script { outpoint, .. }
            | Self::WholeTx { outpoint, .. } => *outpoint,
        }
    }
}
