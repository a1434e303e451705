//! Storage seams: subscriber preferences, delivery records and the
//! encounter source.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    DeliveredMessage, Encounter, EncounterExpiry, EntityId, Subscriber, SubscriberId,
    Subscription,
};

mod memory;

pub use memory::{MemoryDeliveryStore, MemoryEncounterSource, MemoryPreferenceStore};

/// Errors raised by store and source implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed a query.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A row could not be mapped onto a domain record.
    #[error("invalid row in {table}: {message}")]
    InvalidRow { table: &'static str, message: String },

    /// The call did not complete within the configured timeout.
    #[error("store call timed out")]
    Timeout,
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }
}

impl From<tokio::time::error::Elapsed> for StoreError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Subscriber and subscription records owned by the front end.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn subscribers(&self) -> Result<Vec<Subscriber>>;

    async fn subscriptions(&self) -> Result<Vec<Subscription>>;

    /// Idempotently create the subscriber on first interaction.
    async fn get_or_create_subscriber(&self, id: SubscriberId) -> Result<Subscriber>;

    async fn save_subscriber(&self, subscriber: &Subscriber) -> Result<()>;

    /// Insert or replace the subscription for `(subscriber, entity)`.
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Returns whether a row was removed.
    async fn delete_subscription(
        &self,
        subscriber_id: SubscriberId,
        entity_id: EntityId,
    ) -> Result<bool>;

    /// Returns the number of rows removed.
    async fn clear_subscriptions(&self, subscriber_id: SubscriberId) -> Result<u64>;

    async fn subscriptions_for(&self, subscriber_id: SubscriberId) -> Result<Vec<Subscription>>;
}

/// Durable side of the delivery ledger: encounter expiries and the
/// artifacts sent for them.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn record_encounter(&self, encounter_id: &str, expires_at: i64) -> Result<()>;

    async fn record_message(&self, message: &DeliveredMessage) -> Result<()>;

    /// Encounters whose expiry is strictly before `now`.
    async fn expired_encounters(&self, now: i64) -> Result<Vec<EncounterExpiry>>;

    async fn messages_for(&self, encounter_id: &str) -> Result<Vec<DeliveredMessage>>;

    async fn delete_message(&self, message: &DeliveredMessage) -> Result<()>;

    async fn delete_encounter(&self, encounter_id: &str) -> Result<()>;
}

/// Read-only view over the external encounter store.
#[async_trait]
pub trait EncounterSource: Send + Sync {
    /// Encounters with a quality score whose last update and expiry are
    /// both after `since` (unix seconds).
    async fn recent_encounters(&self, since: i64) -> Result<Vec<Encounter>>;
}
