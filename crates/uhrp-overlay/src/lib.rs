//! # UHRP Overlay
//!
//! Overlay services for the Universal Hash Resolution Protocol.
//!
//! - [`UhrpTopicManager`] decides which transaction outputs are valid
//!   content availability advertisements.
//! - [`UhrpLookupService`] keeps the live advertisements in a
//!   [`CommitmentStore`] and answers lookups over them.
//! - [`UhrpOverlay`] wires both to one topic and drives them the way an
//!   overlay engine would.
//!
//! ## Example
//!
//! ```rust,ignore
//! use uhrp_overlay::{OverlayConfig, UhrpOverlay};
//!
//! let overlay = UhrpOverlay::open(&OverlayConfig::default())?;
//! overlay.submit(txid, &transaction, &[]).await?;
//!
//! let found = overlay.lookup(Some(&serde_json::json!("active"))).await?;
//! ```

pub mod config;
pub mod error;
pub mod lookup_service;
pub mod topic_manager;

pub use config::{DEFAULT_LOOKUP_SERVICE, DEFAULT_TOPIC, OverlayConfig};
pub use error::{LookupError, OverlayError};
pub use lookup_service::{LookupService, UhrpLookupService};
pub use topic_manager::UhrpTopicManager;

use serde_json::Value;
use tracing::info;
use uhrp_core::{
    AdmittanceInstructions, Clock, OutputAdmittedByTopic, OutputSpent, SystemClock, Transaction,
    Txid, UtxoReference,
};
use uhrp_storage::{CommitmentStore, InMemoryCommitmentStore, RedbCommitmentStore};

/// Topic manager and lookup service bound to the same topic
pub struct UhrpOverlay<S = RedbCommitmentStore, C = SystemClock> {
    topic_manager: UhrpTopicManager,
    lookup_service: UhrpLookupService<S, C>,
}

impl UhrpOverlay {
    /// Open the redb-backed overlay described by `config`
    pub fn open(config: &OverlayConfig) -> Result<Self, OverlayError> {
        let store = RedbCommitmentStore::open(config.storage.clone())?;
        info!(
            topic = %config.topic,
            lookup_service = %config.lookup_service,
            "Opened UHRP overlay"
        );
        Ok(Self::with_store(&config.topic, store))
    }
}

impl UhrpOverlay<InMemoryCommitmentStore> {
    /// Overlay with a fresh in-memory index
    pub fn in_memory(topic: impl Into<String>) -> Self {
        Self::with_store(topic, InMemoryCommitmentStore::new())
    }
}

impl<S: CommitmentStore> UhrpOverlay<S> {
    pub fn with_store(topic: impl Into<String>, store: S) -> Self {
        Self::with_clock(topic, store, SystemClock)
    }
}

impl<S: CommitmentStore, C: Clock> UhrpOverlay<S, C> {
    pub fn with_clock(topic: impl Into<String>, store: S, clock: C) -> Self {
        let topic = topic.into();
        Self {
            topic_manager: UhrpTopicManager::new(topic.clone()),
            lookup_service: UhrpLookupService::with_clock(topic, store, clock),
        }
    }

    pub fn topic_manager(&self) -> &UhrpTopicManager {
        &self.topic_manager
    }

    pub fn lookup_service(&self) -> &UhrpLookupService<S, C> {
        &self.lookup_service
    }

    /// Run a transaction through admission and deliver the resulting events
    ///
    /// A rejected transaction changes nothing. Otherwise the
    /// `previous_coins` the transaction consumes are reported as spent and
    /// each admitted output is handed to the lookup service as a
    /// locking-script admission.
    pub async fn submit(
        &self,
        txid: Txid,
        transaction: &Transaction,
        previous_coins: &[UtxoReference],
    ) -> Result<AdmittanceInstructions, OverlayError> {
        let topic = self.topic_manager.topic();
        let instructions = self
            .topic_manager
            .admissible_outputs(transaction, previous_coins)?;

        for coin in previous_coins {
            self.lookup_service
                .output_spent(&OutputSpent::outpoint_only(topic, *coin))
                .await?;
        }

        for &index in &instructions.outputs_to_admit {
            let output = &transaction.outputs[index as usize];
            let payload = OutputAdmittedByTopic::LockingScript {
                topic: topic.to_string(),
                outpoint: UtxoReference::new(txid, index),
                satoshis: output.satoshis,
                locking_script: output.locking_script.clone(),
            };
            self.lookup_service.output_admitted_by_topic(&payload).await?;
        }

        info!(%txid, admitted = instructions.outputs_to_admit.len(), "Submitted transaction");
        Ok(instructions)
    }

    /// Report a spend of a tracked output
    pub async fn spend(&self, outpoint: UtxoReference) -> Result<(), OverlayError> {
        let payload = OutputSpent::outpoint_only(self.topic_manager.topic(), outpoint);
        Ok(self.lookup_service.output_spent(&payload).await?)
    }

    /// Evict an output from the index
    pub async fn evict(&self, outpoint: UtxoReference) -> Result<(), OverlayError> {
        Ok(self.lookup_service.output_evicted(&outpoint).await?)
    }

    /// Query the lookup service
    pub async fn lookup(&self, query: Option<&Value>) -> Result<Vec<UtxoReference>, OverlayError> {
        Ok(self.lookup_service.lookup(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uhrp_core::{AdmissionError, CommitmentToken, TxOutput};

    fn advert(url: &str) -> TxOutput {
        let token = CommitmentToken {
            protocol_address: "1UHRPYnMHPuQ5Tgb3AF8JXqwKkmZVy5hG".into(),
            content_hash: [0x11; 32],
            url: url.into(),
            expiry_unix_secs: i64::MAX,
            size_bytes: 1,
        };
        TxOutput::new(1, token.to_locking_script(&[0x02; 33]))
    }

    #[tokio::test]
    async fn test_submit_indexes_admitted_outputs() {
        let overlay = UhrpOverlay::in_memory(DEFAULT_TOPIC);
        let txid = Txid::new([0xaa; 32]);
        let tx = Transaction::with_outputs(vec![TxOutput::new(0, vec![0x6a]), advert("https://a")]);

        let instructions = overlay.submit(txid, &tx, &[]).await.unwrap();
        assert_eq!(instructions.outputs_to_admit, vec![1]);
        assert_eq!(
            overlay.lookup(Some(&json!("active"))).await.unwrap(),
            vec![UtxoReference::new(txid, 1)]
        );
    }

    #[tokio::test]
    async fn test_submit_spends_previous_coins() {
        let overlay = UhrpOverlay::in_memory(DEFAULT_TOPIC);
        let first = Txid::new([1; 32]);
        let second = Txid::new([2; 32]);
        let tx = Transaction::with_outputs(vec![advert("https://a")]);

        overlay.submit(first, &tx, &[]).await.unwrap();
        overlay
            .submit(second, &tx, &[UtxoReference::new(first, 0)])
            .await
            .unwrap();

        assert_eq!(
            overlay.lookup(Some(&json!("all"))).await.unwrap(),
            vec![UtxoReference::new(second, 0)]
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_transaction_without_adverts() {
        let overlay = UhrpOverlay::in_memory(DEFAULT_TOPIC);
        let tx = Transaction::with_outputs(vec![TxOutput::new(0, vec![0x6a])]);

        let err = overlay.submit(Txid::new([1; 32]), &tx, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            OverlayError::Admission(AdmissionError::NoValidToken)
        ));
    }

    #[tokio::test]
    async fn test_spend_and_evict() {
        let overlay = UhrpOverlay::in_memory(DEFAULT_TOPIC);
        let txid = Txid::new([3; 32]);
        let tx = Transaction::with_outputs(vec![advert("https://a"), advert("https://b")]);
        overlay.submit(txid, &tx, &[]).await.unwrap();

        overlay.spend(UtxoReference::new(txid, 0)).await.unwrap();
        overlay.evict(UtxoReference::new(txid, 1)).await.unwrap();
        assert!(overlay.lookup(Some(&json!("all"))).await.unwrap().is_empty());
    }
}
