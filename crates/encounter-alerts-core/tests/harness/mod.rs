//! Shared fixtures for engine integration tests.
//!
//! Wires an [`Engine`] to in-memory stores and a gateway that records every
//! call instead of talking to a chat service.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use encounter_alerts_core::gateway::{GatewayError, MessageGateway, Result};
use encounter_alerts_core::store::{
    self, DeliveryStore, EncounterSource, MemoryDeliveryStore, MemoryEncounterSource,
    MemoryPreferenceStore, StoreError,
};
use encounter_alerts_core::{
    DeliveredMessage, DeliveryLedger, Encounter, EncounterExpiry, Engine, EngineParts,
    EngineSettings, Indices, MessageId, NameTable, Preferences, SubscriberId,
};
use parking_lot::Mutex;

/// Base timestamp for scenarios; any fixed value works.
pub const NOW: i64 = 1_700_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat: SubscriberId,
        text: String,
    },
    Media {
        chat: SubscriberId,
        url: String,
    },
    Location {
        chat: SubscriberId,
    },
    Venue {
        chat: SubscriberId,
        title: String,
        address: String,
    },
}

impl Sent {
    pub fn chat(&self) -> SubscriberId {
        match self {
            Sent::Text { chat, .. }
            | Sent::Media { chat, .. }
            | Sent::Location { chat }
            | Sent::Venue { chat, .. } => *chat,
        }
    }
}

/// Gateway double that records sends and deletions.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    next_id: AtomicI64,
    sent: Mutex<Vec<(MessageId, Sent)>>,
    deleted: Mutex<Vec<(SubscriberId, MessageId)>>,
    fail_media: Mutex<bool>,
    fail_delete: Mutex<bool>,
}

impl RecordingGateway {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn sent_to(&self, chat: SubscriberId) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| s.chat() == chat).collect()
    }

    pub fn texts_to(&self, chat: SubscriberId) -> Vec<String> {
        self.sent_to(chat)
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<(SubscriberId, MessageId)> {
        self.deleted.lock().clone()
    }

    pub fn fail_media(&self, fail: bool) {
        *self.fail_media.lock() = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        *self.fail_delete.lock() = fail;
    }

    fn record(&self, sent: Sent) -> MessageId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().push((id, sent));
        id
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn send_text(&self, chat_id: SubscriberId, text: &str) -> Result<MessageId> {
        Ok(self.record(Sent::Text {
            chat: chat_id,
            text: text.to_string(),
        }))
    }

    async fn send_media(&self, chat_id: SubscriberId, url: &str) -> Result<MessageId> {
        if *self.fail_media.lock() {
            return Err(GatewayError::Api {
                method: "sendSticker",
                code: 400,
                description: "Bad Request: wrong file identifier".to_string(),
            });
        }
        Ok(self.record(Sent::Media {
            chat: chat_id,
            url: url.to_string(),
        }))
    }

    async fn send_location(
        &self,
        chat_id: SubscriberId,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<MessageId> {
        Ok(self.record(Sent::Location { chat: chat_id }))
    }

    async fn send_venue(
        &self,
        chat_id: SubscriberId,
        _latitude: f64,
        _longitude: f64,
        title: &str,
        address: &str,
    ) -> Result<MessageId> {
        Ok(self.record(Sent::Venue {
            chat: chat_id,
            title: title.to_string(),
            address: address.to_string(),
        }))
    }

    async fn delete_message(&self, chat_id: SubscriberId, message_id: MessageId) -> Result<()> {
        if *self.fail_delete.lock() {
            return Err(GatewayError::Api {
                method: "deleteMessage",
                code: 400,
                description: "Bad Request: message can't be deleted".to_string(),
            });
        }
        self.deleted.lock().push((chat_id, message_id));
        Ok(())
    }
}

pub fn names() -> NameTable {
    NameTable::from_json(
        r#"{
            "pokemon": {
                "16": {"name": "Pidgey", "pokedexId": 16},
                "25": {"name": "Pikachu", "pokedexId": 25, "forms": {"2668": {"name": "Party Hat", "isCostume": true}}}
            },
            "moves": {"221": {"name": "Tackle"}, "13": {"name": "Wrap"}}
        }"#,
        r#"{"de": {"Pidgey": "Taubsi"}}"#,
    )
    .expect("fixture tables parse")
}

pub fn encounter(id: &str, entity_id: u32, quality: f64) -> Encounter {
    Encounter {
        id: id.to_string(),
        entity_id,
        form: None,
        latitude: 52.52,
        longitude: 13.405,
        quality,
        level: Some(30),
        cp: Some(500),
        attack: Some(15),
        defense: Some(15),
        stamina: Some(15),
        gender: Some(1),
        size: None,
        weather: None,
        move_1: Some(221),
        move_2: Some(13),
        expires_at: NOW + 600,
        updated_at: NOW - 5,
        pvp: None,
    }
}

/// How [`SwitchableSource`] answers the next poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceMode {
    #[default]
    Serve,
    Fail,
    /// Never returns; only the engine's call timeout ends the poll.
    Stall,
}

/// In-memory source whose polls can be made to fail or hang.
#[derive(Debug, Default)]
pub struct SwitchableSource {
    inner: MemoryEncounterSource,
    mode: Mutex<SourceMode>,
}

impl SwitchableSource {
    pub fn replace(&self, encounters: Vec<Encounter>) {
        self.inner.replace(encounters);
    }

    pub fn set_mode(&self, mode: SourceMode) {
        *self.mode.lock() = mode;
    }
}

#[async_trait]
impl EncounterSource for SwitchableSource {
    async fn recent_encounters(&self, since: i64) -> store::Result<Vec<Encounter>> {
        let mode = *self.mode.lock();
        match mode {
            SourceMode::Serve => self.inner.recent_encounters(since).await,
            SourceMode::Fail => Err(StoreError::backend(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset,
            ))),
            SourceMode::Stall => std::future::pending().await,
        }
    }
}

/// In-memory delivery store whose artifact writes can be made to fail.
#[derive(Debug, Default)]
pub struct SwitchableDeliveries {
    inner: MemoryDeliveryStore,
    fail_record_message: Mutex<bool>,
}

impl SwitchableDeliveries {
    pub fn fail_record_message(&self, fail: bool) {
        *self.fail_record_message.lock() = fail;
    }

    pub fn encounter_count(&self) -> usize {
        self.inner.encounter_count()
    }

    pub fn message_count(&self) -> usize {
        self.inner.message_count()
    }
}

#[async_trait]
impl DeliveryStore for SwitchableDeliveries {
    async fn record_encounter(&self, encounter_id: &str, expires_at: i64) -> store::Result<()> {
        self.inner.record_encounter(encounter_id, expires_at).await
    }

    async fn record_message(&self, message: &DeliveredMessage) -> store::Result<()> {
        if *self.fail_record_message.lock() {
            return Err(StoreError::backend(std::io::Error::other("disk full")));
        }
        self.inner.record_message(message).await
    }

    async fn expired_encounters(&self, now: i64) -> store::Result<Vec<EncounterExpiry>> {
        self.inner.expired_encounters(now).await
    }

    async fn messages_for(&self, encounter_id: &str) -> store::Result<Vec<DeliveredMessage>> {
        self.inner.messages_for(encounter_id).await
    }

    async fn delete_message(&self, message: &DeliveredMessage) -> store::Result<()> {
        self.inner.delete_message(message).await
    }

    async fn delete_encounter(&self, encounter_id: &str) -> store::Result<()> {
        self.inner.delete_encounter(encounter_id).await
    }
}

/// Engine plus handles to every collaborator it was built from.
pub struct World {
    pub engine: Engine,
    pub preferences: Preferences,
    pub source: Arc<SwitchableSource>,
    pub deliveries: Arc<SwitchableDeliveries>,
    pub gateway: Arc<RecordingGateway>,
    pub ledger: Arc<DeliveryLedger>,
}

impl World {
    pub fn new() -> Self {
        let store = Arc::new(MemoryPreferenceStore::new());
        let indices = Arc::new(Indices::new());
        let source = Arc::new(SwitchableSource::default());
        let deliveries = Arc::new(SwitchableDeliveries::default());
        let gateway = Arc::new(RecordingGateway::default());
        let ledger = Arc::new(DeliveryLedger::new());

        let engine = Engine::new(
            EngineParts {
                indices: Arc::clone(&indices),
                ledger: Arc::clone(&ledger),
                source: source.clone(),
                deliveries: deliveries.clone(),
                gateway: gateway.clone(),
                names: Arc::new(names()),
            },
            EngineSettings {
                lookback: Duration::from_secs(30),
                io_timeout: Duration::from_secs(5),
                sticker_base_url: "https://icons.test".to_string(),
            },
        );

        Self {
            engine,
            preferences: Preferences::new(store, indices),
            source,
            deliveries,
            gateway,
            ledger,
        }
    }

    pub fn publish(&self, encounters: Vec<Encounter>) {
        self.source.replace(encounters);
    }
}
