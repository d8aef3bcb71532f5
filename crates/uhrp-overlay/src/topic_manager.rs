//! Admission of UHRP advertisements into the topic

use tracing::{debug, warn};
use uhrp_core::{
    AdmissionError, AdmittanceInstructions, CommitmentToken, RawTransactionDecoder,
    ServiceMetadata, TopicManager, Transaction, TransactionDecoder, UtxoReference,
};

const DOCUMENTATION: &str = include_str!("../docs/topic_manager.md");

/// Topic manager for UHRP commitments
///
/// An output is admissible when its locking script decodes as a PushDrop
/// token whose fields form a valid [`CommitmentToken`]. Outputs are judged
/// independently.
#[derive(Debug, Clone)]
pub struct UhrpTopicManager<D = RawTransactionDecoder> {
    topic: String,
    decoder: D,
}

impl UhrpTopicManager {
    /// Create a topic manager using the raw transaction decoder
    pub fn new(topic: impl Into<String>) -> Self {
        Self::with_decoder(topic, RawTransactionDecoder)
    }
}

impl<D: TransactionDecoder> UhrpTopicManager<D> {
    /// Create a topic manager with a custom transaction decoder
    pub fn with_decoder(topic: impl Into<String>, decoder: D) -> Self {
        Self {
            topic: topic.into(),
            decoder,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Admission decision for an already decoded transaction
    pub fn admissible_outputs(
        &self,
        transaction: &Transaction,
        previous_coins: &[UtxoReference],
    ) -> Result<AdmittanceInstructions, AdmissionError> {
        let mut outputs_to_admit = Vec::new();

        for (index, output) in transaction.outputs.iter().enumerate() {
            match CommitmentToken::from_locking_script(&output.locking_script) {
                Ok(_) => outputs_to_admit.push(index as u32),
                Err(e) => debug!(topic = %self.topic, output = index, error = %e, "Skipping output"),
            }
        }

        if outputs_to_admit.is_empty() {
            return Err(AdmissionError::NoValidToken);
        }

        debug!(
            topic = %self.topic,
            admitted = outputs_to_admit.len(),
            retained = previous_coins.len(),
            "Identified admissible outputs"
        );

        Ok(AdmittanceInstructions {
            outputs_to_admit,
            coins_to_retain: previous_coins.to_vec(),
        })
    }
}

impl<D: TransactionDecoder> TopicManager for UhrpTopicManager<D> {
    fn identify_admissible_outputs(
        &self,
        transaction: &[u8],
        previous_coins: &[UtxoReference],
    ) -> Result<AdmittanceInstructions, AdmissionError> {
        match self.decoder.decode(transaction) {
            Ok(transaction) => self.admissible_outputs(&transaction, previous_coins),
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "Undecodable transaction, admitting nothing");
                Ok(AdmittanceInstructions::default())
            }
        }
    }

    fn documentation(&self) -> &'static str {
        DOCUMENTATION
    }

    fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata::new(
            "Universal Hash Resolution Protocol",
            "Manages UHRP content availability advertisements.",
        )
    }
}
