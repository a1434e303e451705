//! The engine: one tick runs the cleanup cycle, then the matching and
//! dispatch cycle.
//!
//! All state the cycles touch is owned here and injected at construction,
//! so a tick can be driven deterministically with in-memory adapters and an
//! explicit `now`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::error::Elapsed;
use tracing::{info, instrument};

use crate::gateway::MessageGateway;
use crate::index::Indices;
use crate::ledger::DeliveryLedger;
use crate::lookup::NameTable;
use crate::store::{DeliveryStore, EncounterSource};

mod cleanup;
mod dispatch;

/// Tunables for a running engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Encounters updated within this window before `now` are polled.
    pub lookback: Duration,
    /// Upper bound for every individual store or gateway call.
    pub io_timeout: Duration,
    /// Base URL for media attachments.
    pub sticker_base_url: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::from_secs(30),
            io_timeout: Duration::from_secs(10),
            sticker_base_url: "https://raw.githubusercontent.com/WatWowMap/wwm-uicons-webp/main"
                .to_string(),
        }
    }
}

/// Collaborators the engine reads from and writes to.
#[derive(Clone)]
pub struct EngineParts {
    pub indices: Arc<Indices>,
    pub ledger: Arc<DeliveryLedger>,
    pub source: Arc<dyn EncounterSource>,
    pub deliveries: Arc<dyn DeliveryStore>,
    pub gateway: Arc<dyn MessageGateway>,
    pub names: Arc<NameTable>,
}

/// Outcome of one tick, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Expired encounters whose records were discarded.
    pub expired: usize,
    /// Artifacts retracted through the gateway.
    pub retracted: usize,
    /// Encounters returned by the source.
    pub encounters: usize,
    /// Subscribers notified (ledger claims won).
    pub notified: usize,
    /// Artifacts sent.
    pub messages: usize,
}

pub struct Engine {
    indices: Arc<Indices>,
    ledger: Arc<DeliveryLedger>,
    source: Arc<dyn EncounterSource>,
    deliveries: Arc<dyn DeliveryStore>,
    gateway: Arc<dyn MessageGateway>,
    names: Arc<NameTable>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(parts: EngineParts, settings: EngineSettings) -> Self {
        Self {
            indices: parts.indices,
            ledger: parts.ledger,
            source: parts.source,
            deliveries: parts.deliveries,
            gateway: parts.gateway,
            names: parts.names,
            settings,
        }
    }

    /// Run the cleanup cycle, then the matching and dispatch cycle, at `now`
    /// (unix seconds). Per-item failures are logged and skipped; a tick never
    /// fails as a whole.
    #[instrument(skip(self))]
    pub async fn tick(&self, now: i64) -> TickReport {
        let mut report = TickReport::default();
        self.cleanup(now, &mut report).await;
        self.dispatch(now, &mut report).await;

        info!(
            expired = report.expired,
            retracted = report.retracted,
            encounters = report.encounters,
            notified = report.notified,
            messages = report.messages,
            "Tick complete"
        );
        report
    }

    pub fn indices(&self) -> &Arc<Indices> {
        &self.indices
    }

    pub fn ledger(&self) -> &Arc<DeliveryLedger> {
        &self.ledger
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Apply the configured per-call timeout to a store or gateway future.
    async fn bounded<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Elapsed>,
    {
        tokio::time::timeout(self.settings.io_timeout, fut)
            .await
            .map_err(E::from)?
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ledger_entries", &self.ledger.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
