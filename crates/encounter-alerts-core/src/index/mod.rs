//! In-memory projections of the preference store.
//!
//! Both indices are rebuilt wholesale from the store and published together
//! as one immutable [`IndexSnapshot`]. Readers clone the `Arc` and never see a
//! half-built index; writers are serialised so an older rebuild cannot
//! publish over a newer one. Every store read is bounded by the index's call
//! timeout, so a hung store releases the rebuild lock with an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::store::{PreferenceStore, Result};

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

mod subscribers;
mod subscriptions;

pub use subscribers::SubscriberIndex;
pub use subscriptions::SubscriptionIndex;

/// Consistent view of both indices.
#[derive(Debug, Default, Clone)]
pub struct IndexSnapshot {
    pub subscribers: Arc<SubscriberIndex>,
    pub subscriptions: Arc<SubscriptionIndex>,
}

#[derive(Debug)]
pub struct Indices {
    current: RwLock<Arc<IndexSnapshot>>,
    rebuild: Mutex<()>,
    io_timeout: Duration,
}

impl Default for Indices {
    fn default() -> Self {
        Self {
            current: RwLock::default(),
            rebuild: Mutex::new(()),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

impl Indices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each store call made on behalf of these indices.
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Run a store call under the call timeout.
    pub(crate) async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.io_timeout, fut).await?
    }

    /// Build both indices from the store.
    pub async fn load(store: &dyn PreferenceStore) -> Result<Self> {
        let indices = Self::new();
        indices.rebuild_all(store).await?;
        Ok(indices)
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&*self.current.read())
    }

    /// Reload subscribers, then re-filter the subscription rows against them.
    #[instrument(skip_all)]
    pub async fn rebuild_subscribers(&self, store: &dyn PreferenceStore) -> Result<()> {
        // A subscriber's notify flag decides which subscription rows are live,
        // so both halves move together.
        self.rebuild_all(store).await
    }

    /// Reload subscription rows against the current subscriber index.
    #[instrument(skip_all)]
    pub async fn rebuild_subscriptions(&self, store: &dyn PreferenceStore) -> Result<()> {
        let _guard = self.rebuild.lock().await;

        let rows = self.bounded(store.subscriptions()).await?;
        let subscribers = Arc::clone(&self.snapshot().subscribers);
        let subscriptions = Arc::new(SubscriptionIndex::build(rows, &subscribers));

        self.publish(IndexSnapshot {
            subscribers,
            subscriptions,
        });
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn rebuild_all(&self, store: &dyn PreferenceStore) -> Result<()> {
        let _guard = self.rebuild.lock().await;

        let subscribers = Arc::new(SubscriberIndex::build(
            self.bounded(store.subscribers()).await?,
        ));
        let rows = self.bounded(store.subscriptions()).await?;
        let subscriptions = Arc::new(SubscriptionIndex::build(rows, &subscribers));

        self.publish(IndexSnapshot {
            subscribers,
            subscriptions,
        });
        Ok(())
    }

    fn publish(&self, snapshot: IndexSnapshot) {
        gauge!("alerts.subscribers").set(snapshot.subscribers.len() as f64);
        gauge!("alerts.subscriptions").set(snapshot.subscriptions.total() as f64);
        gauge!("alerts.subscriptions.active").set(snapshot.subscriptions.active() as f64);
        debug!(
            subscribers = snapshot.subscribers.len(),
            subscriptions = snapshot.subscriptions.total(),
            active_subscriptions = snapshot.subscriptions.active(),
            "Published index snapshot"
        );

        *self.current.write() = Arc::new(snapshot);
    }
}
