//! Queryable index of live UHRP advertisements
//!
//! The overlay runtime feeds [`LookupService`] admission, spend, and
//! eviction events; the service keeps one [`CommitmentRecord`] per live
//! output in a [`CommitmentStore`] and answers [`LookupQuery`] requests.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use uhrp_core::{
    AdmissionMode, Clock, CommitmentRecord, CommitmentToken, LookupQuery, OutputAdmittedByTopic,
    OutputSpent, ServiceMetadata, SpendNotificationMode, SystemClock, UtxoReference,
};
use uhrp_storage::CommitmentStore;

use crate::error::LookupError;

const DOCUMENTATION: &str = include_str!("../docs/lookup_service.md");

/// Event sink and query surface of an overlay lookup service
#[async_trait]
pub trait LookupService: Send + Sync {
    /// Payload shape this service wants for admission events
    fn admission_mode(&self) -> AdmissionMode;

    /// Payload shape this service wants for spend events
    fn spend_notification_mode(&self) -> SpendNotificationMode;

    /// An output was admitted to a topic
    async fn output_admitted_by_topic(
        &self,
        payload: &OutputAdmittedByTopic,
    ) -> Result<(), LookupError>;

    /// A previously admitted output was spent
    async fn output_spent(&self, payload: &OutputSpent) -> Result<(), LookupError>;

    /// An output was removed from the overlay's history
    async fn output_evicted(&self, outpoint: &UtxoReference) -> Result<(), LookupError>;

    /// Answer a query; `None` means the caller sent no query
    async fn lookup(&self, query: Option<&Value>) -> Result<Vec<UtxoReference>, LookupError>;

    /// Human-readable service documentation (Markdown)
    fn documentation(&self) -> &'static str;

    fn metadata(&self) -> ServiceMetadata;
}

/// Lookup service for UHRP commitments
pub struct UhrpLookupService<S, C = SystemClock> {
    topic: String,
    store: S,
    clock: C,
}

impl<S: CommitmentStore> UhrpLookupService<S> {
    /// Create a service bound to `topic` using the system clock
    pub fn new(topic: impl Into<String>, store: S) -> Self {
        Self::with_clock(topic, store, SystemClock)
    }
}

impl<S: CommitmentStore, C: Clock> UhrpLookupService<S, C> {
    /// Create a service with an explicit clock
    pub fn with_clock(topic: impl Into<String>, store: S, clock: C) -> Self {
        Self {
            topic: topic.into(),
            store,
            clock,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[async_trait]
impl<S: CommitmentStore, C: Clock> LookupService for UhrpLookupService<S, C> {
    fn admission_mode(&self) -> AdmissionMode {
        AdmissionMode::LockingScript
    }

    fn spend_notification_mode(&self) -> SpendNotificationMode {
        SpendNotificationMode::None
    }

    #[instrument(skip_all, fields(outpoint = %payload.outpoint()))]
    async fn output_admitted_by_topic(
        &self,
        payload: &OutputAdmittedByTopic,
    ) -> Result<(), LookupError> {
        let OutputAdmittedByTopic::LockingScript {
            topic,
            outpoint,
            locking_script,
            ..
        } = payload
        else {
            return Err(LookupError::InvalidPayload {
                expected: self.admission_mode().as_str(),
                actual: payload.mode().as_str(),
            });
        };

        if *topic != self.topic {
            return Ok(());
        }

        let token = match CommitmentToken::from_locking_script(locking_script) {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "Ignoring admitted output that is not a commitment");
                return Ok(());
            }
        };

        let record = CommitmentRecord::new(*outpoint, token, self.clock.now_utc());
        self.store.upsert(&record).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(outpoint = %payload.outpoint()))]
    async fn output_spent(&self, payload: &OutputSpent) -> Result<(), LookupError> {
        let OutputSpent::None { topic, outpoint } = payload else {
            return Err(LookupError::InvalidPayload {
                expected: self.spend_notification_mode().as_str(),
                actual: payload.mode().as_str(),
            });
        };

        if *topic != self.topic {
            return Ok(());
        }

        self.store.remove(outpoint).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn output_evicted(&self, outpoint: &UtxoReference) -> Result<(), LookupError> {
        self.store.remove(outpoint).await?;
        Ok(())
    }

    async fn lookup(&self, query: Option<&Value>) -> Result<Vec<UtxoReference>, LookupError> {
        let query = LookupQuery::parse(query).ok_or(LookupError::InvalidQuery)?;

        let results = match &query {
            LookupQuery::All => self.store.all().await?,
            LookupQuery::Active => self.store.active_at(self.clock.unix_secs()).await?,
            LookupQuery::ByUrl(url) => self.store.find_by_url(url).await?.into_iter().collect(),
            LookupQuery::ByHashHex(hash) => self
                .store
                .find_by_hash_hex(&hash.to_lowercase())
                .await?
                .into_iter()
                .collect(),
            LookupQuery::Other => Vec::new(),
        };

        debug!(?query, results = results.len(), "Answered lookup");
        Ok(results)
    }

    fn documentation(&self) -> &'static str {
        DOCUMENTATION
    }

    fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata::new(
            "UHRP Lookup Service",
            "Lookup Service for User file hosting commitment tokens",
        )
    }
}
