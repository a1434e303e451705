//! In-memory store implementations for tests and local dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DeliveryStore, EncounterSource, PreferenceStore, Result};
use crate::model::{
    DeliveredMessage, Encounter, EncounterExpiry, EntityId, Subscriber, SubscriberId,
    Subscription,
};

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    subscribers: Mutex<BTreeMap<SubscriberId, Subscriber>>,
    subscriptions: Mutex<BTreeMap<(SubscriberId, EntityId), Subscription>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store without going through the preference path.
    pub fn with_subscribers(subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.subscribers.lock();
            for subscriber in subscribers {
                guard.insert(subscriber.id, subscriber);
            }
        }
        store
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self.subscribers.lock().values().cloned().collect())
    }

    async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        Ok(self.subscriptions.lock().values().copied().collect())
    }

    async fn get_or_create_subscriber(&self, id: SubscriberId) -> Result<Subscriber> {
        Ok(self
            .subscribers
            .lock()
            .entry(id)
            .or_insert_with(|| Subscriber::new(id))
            .clone())
    }

    async fn save_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        self.subscribers
            .lock()
            .insert(subscriber.id, subscriber.clone());
        Ok(())
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .lock()
            .insert(subscription.key(), *subscription);
        Ok(())
    }

    async fn delete_subscription(
        &self,
        subscriber_id: SubscriberId,
        entity_id: EntityId,
    ) -> Result<bool> {
        Ok(self
            .subscriptions
            .lock()
            .remove(&(subscriber_id, entity_id))
            .is_some())
    }

    async fn clear_subscriptions(&self, subscriber_id: SubscriberId) -> Result<u64> {
        let mut guard = self.subscriptions.lock();
        let before = guard.len();
        guard.retain(|(owner, _), _| *owner != subscriber_id);
        Ok((before - guard.len()) as u64)
    }

    async fn subscriptions_for(&self, subscriber_id: SubscriberId) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .values()
            .filter(|s| s.subscriber_id == subscriber_id)
            .copied()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDeliveryStore {
    encounters: Mutex<HashMap<String, i64>>,
    messages: Mutex<HashSet<DeliveredMessage>>,
}

impl MemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encounter_count(&self) -> usize {
        self.encounters.lock().len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }
}

#[async_trait]
impl DeliveryStore for MemoryDeliveryStore {
    async fn record_encounter(&self, encounter_id: &str, expires_at: i64) -> Result<()> {
        self.encounters
            .lock()
            .insert(encounter_id.to_string(), expires_at);
        Ok(())
    }

    async fn record_message(&self, message: &DeliveredMessage) -> Result<()> {
        self.messages.lock().insert(message.clone());
        Ok(())
    }

    async fn expired_encounters(&self, now: i64) -> Result<Vec<EncounterExpiry>> {
        let mut expired: Vec<EncounterExpiry> = self
            .encounters
            .lock()
            .iter()
            .filter(|(_, expires_at)| **expires_at < now)
            .map(|(id, expires_at)| EncounterExpiry {
                encounter_id: id.clone(),
                expires_at: *expires_at,
            })
            .collect();
        expired.sort_by(|a, b| a.encounter_id.cmp(&b.encounter_id));
        Ok(expired)
    }

    async fn messages_for(&self, encounter_id: &str) -> Result<Vec<DeliveredMessage>> {
        let mut messages: Vec<DeliveredMessage> = self
            .messages
            .lock()
            .iter()
            .filter(|m| m.encounter_id == encounter_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.chat_id, m.message_id));
        Ok(messages)
    }

    async fn delete_message(&self, message: &DeliveredMessage) -> Result<()> {
        self.messages.lock().remove(message);
        Ok(())
    }

    async fn delete_encounter(&self, encounter_id: &str) -> Result<()> {
        self.encounters.lock().remove(encounter_id);
        Ok(())
    }
}

/// Source that returns whatever encounters are currently loaded, filtered
/// the same way the scanner query filters them.
#[derive(Debug, Default)]
pub struct MemoryEncounterSource {
    encounters: Mutex<Vec<Encounter>>,
}

impl MemoryEncounterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, encounters: Vec<Encounter>) {
        *self.encounters.lock() = encounters;
    }
}

#[async_trait]
impl EncounterSource for MemoryEncounterSource {
    async fn recent_encounters(&self, since: i64) -> Result<Vec<Encounter>> {
        Ok(self
            .encounters
            .lock()
            .iter()
            .filter(|e| e.updated_at > since && e.expires_at > since)
            .cloned()
            .collect())
    }
}
