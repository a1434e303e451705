//! Preference mutation path used by command front ends.
//!
//! Every mutation persists first and then rebuilds the indices before
//! returning, so the next tick never reasons over state older than the last
//! acknowledged command. Subscriber updates are read-modify-write on the
//! whole row and run one at a time.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::index::Indices;
use crate::model::{EntityId, Subscriber, SubscriberId, Subscription};
use crate::store::{PreferenceStore, Result};

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
    indices: Arc<Indices>,
    updates: Arc<Mutex<()>>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>, indices: Arc<Indices>) -> Self {
        Self {
            store,
            indices,
            updates: Arc::new(Mutex::new(())),
        }
    }

    /// Fetch the subscriber, registering it with defaults on first contact.
    #[instrument(skip(self))]
    pub async fn subscriber(&self, id: SubscriberId) -> Result<Subscriber> {
        self.indices
            .bounded(self.store.get_or_create_subscriber(id))
            .await
    }

    /// Apply `change` to the stored subscriber and persist it.
    #[instrument(skip(self, change))]
    pub async fn update_subscriber<F>(&self, id: SubscriberId, change: F) -> Result<Subscriber>
    where
        F: FnOnce(&mut Subscriber) + Send,
    {
        // Held until the rebuild publishes, so no update reads a row another
        // update is about to overwrite.
        let _guard = self.updates.lock().await;

        let mut subscriber = self
            .indices
            .bounded(self.store.get_or_create_subscriber(id))
            .await?;
        change(&mut subscriber);
        subscriber.id = id;
        self.indices
            .bounded(self.store.save_subscriber(&subscriber))
            .await?;
        debug!(subscriber_id = id, "Saved subscriber");

        self.indices.rebuild_subscribers(self.store.as_ref()).await?;
        Ok(subscriber)
    }

    /// Create or replace the subscription for its (subscriber, entity) pair.
    #[instrument(skip(self))]
    pub async fn subscribe(&self, subscription: Subscription) -> Result<()> {
        let owner = subscription.subscriber_id;
        let indexed = self.indices.snapshot().subscribers.get(owner).is_some();

        self.indices
            .bounded(self.store.get_or_create_subscriber(owner))
            .await?;
        self.indices
            .bounded(self.store.upsert_subscription(&subscription))
            .await?;
        debug!(
            subscriber_id = owner,
            entity_id = subscription.entity_id,
            "Saved subscription"
        );

        if indexed {
            self.indices
                .rebuild_subscriptions(self.store.as_ref())
                .await
        } else {
            // First contact registered the subscriber as well.
            self.indices.rebuild_all(self.store.as_ref()).await
        }
    }

    /// Returns whether a subscription existed.
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self, subscriber: SubscriberId, entity: EntityId) -> Result<bool> {
        let removed = self
            .indices
            .bounded(self.store.delete_subscription(subscriber, entity))
            .await?;
        self.indices
            .rebuild_subscriptions(self.store.as_ref())
            .await?;
        Ok(removed)
    }

    /// Returns the number of subscriptions removed.
    #[instrument(skip(self))]
    pub async fn clear_subscriptions(&self, subscriber: SubscriberId) -> Result<u64> {
        let removed = self
            .indices
            .bounded(self.store.clear_subscriptions(subscriber))
            .await?;
        self.indices
            .rebuild_subscriptions(self.store.as_ref())
            .await?;
        Ok(removed)
    }

    pub async fn subscriptions(&self, subscriber: SubscriberId) -> Result<Vec<Subscription>> {
        self.indices
            .bounded(self.store.subscriptions_for(subscriber))
            .await
    }

    pub fn indices(&self) -> &Arc<Indices> {
        &self.indices
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences").finish_non_exhaustive()
    }
}
