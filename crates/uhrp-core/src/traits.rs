//! Core traits for the UHRP overlay
//!
//! - [`TopicManager`]: admission decision for a topic
//! - [`Clock`]: time abstraction for testability

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AdmissionError;
use crate::outpoint::UtxoReference;

/// Static descriptive metadata for an overlay component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub name: String,
    pub short_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "iconURL")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "informationURL")]
    pub information_url: Option<String>,
}

impl ServiceMetadata {
    pub fn new(name: impl Into<String>, short_description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_description: short_description.into(),
            icon_url: None,
            version: None,
            information_url: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_information_url(mut self, url: impl Into<String>) -> Self {
        self.information_url = Some(url.into());
        self
    }
}

/// Result of an admission decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmittanceInstructions {
    /// Indices of outputs to admit into the topic
    pub outputs_to_admit: Vec<u32>,
    /// Previously admitted coins the topic keeps tracking
    pub coins_to_retain: Vec<UtxoReference>,
}

impl AdmittanceInstructions {
    pub fn is_empty(&self) -> bool {
        self.outputs_to_admit.is_empty() && self.coins_to_retain.is_empty()
    }
}

/// Decides which outputs of a transaction belong to a topic
///
/// Implementations are pure functions of their inputs.
pub trait TopicManager: Send + Sync {
    /// Identify admissible outputs of `transaction`
    ///
    /// `previous_coins` are the coins this topic already tracks that the
    /// transaction consumes.
    fn identify_admissible_outputs(
        &self,
        transaction: &[u8],
        previous_coins: &[UtxoReference],
    ) -> Result<AdmittanceInstructions, AdmissionError>;

    /// Human-readable protocol documentation (Markdown)
    fn documentation(&self) -> &'static str;

    fn metadata(&self) -> ServiceMetadata;
}

/// Time abstraction for testability
pub trait Clock: Send + Sync {
    /// Get the current UTC datetime
    fn now_utc(&self) -> DateTime<Utc>;

    /// Whole seconds since the Unix epoch
    fn unix_secs(&self) -> i64 {
        self.now_utc().timestamp()
    }
}

/// Real clock implementation using system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulation
#[derive(Debug, Default)]
pub struct FixedClock {
    unix_secs: AtomicI64,
}

impl FixedClock {
    pub fn new(unix_secs: i64) -> Self {
        Self {
            unix_secs: AtomicI64::new(unix_secs),
        }
    }

    pub fn set(&self, unix_secs: i64) {
        self.unix_secs.store(unix_secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.unix_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.unix_secs.load(Ordering::SeqCst), 0)
            .single()
            .unwrap_or_default()
    }

    fn unix_secs(&self) -> i64 {
        self.unix_secs.load(Ordering::SeqCst)
    }
}
