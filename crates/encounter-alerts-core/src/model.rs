//! Domain records shared by the indices, the cycles and the adapters.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::threshold::Threshold;

/// Chat identity. Broadcast channels live in the `-100…` range.
pub type SubscriberId = i64;
/// Kind of encounter (species/category id).
pub type EntityId = u32;
/// Gateway-assigned identifier of a sent artifact.
pub type MessageId = i64;

const CHANNEL_ID_PREFIX: &str = "-100";

/// Subscriber preferences as persisted by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub notify: bool,
    pub language: String,
    /// Send a media attachment before the pin.
    pub stickers: bool,
    /// Send a single venue pin with the caption instead of separate artifacts.
    pub only_map: bool,
    /// Retract delivered artifacts once the encounter expires.
    pub cleanup: bool,
    pub latitude: f64,
    pub longitude: f64,
    /// Default maximum distance in meters.
    pub max_distance: Threshold,
    pub top_quality: bool,
    pub worst_quality: bool,
    pub min_quality: Threshold,
    pub min_level: Threshold,
}

impl Subscriber {
    /// A freshly registered subscriber with the stored column defaults.
    pub fn new(id: SubscriberId) -> Self {
        Self {
            id,
            notify: true,
            language: "de".to_string(),
            stickers: true,
            only_map: false,
            cleanup: true,
            latitude: 0.0,
            longitude: 0.0,
            max_distance: Threshold::UNSET,
            top_quality: false,
            worst_quality: false,
            min_quality: Threshold::UNSET,
            min_level: Threshold::UNSET,
        }
    }

    /// Home location, if both coordinates are set.
    pub fn location(&self) -> Option<Coordinates> {
        if self.latitude != 0.0 && self.longitude != 0.0 {
            Some(Coordinates::new(self.latitude, self.longitude))
        } else {
            None
        }
    }

    pub fn is_channel(&self) -> bool {
        self.id.to_string().starts_with(CHANNEL_ID_PREFIX)
    }
}

/// Per-entity override of a subscriber's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: SubscriberId,
    pub entity_id: EntityId,
    pub min_quality: Threshold,
    pub min_level: Threshold,
    pub max_distance: Threshold,
}

impl Subscription {
    /// Subscription with every threshold deferring to the subscriber defaults.
    pub fn new(subscriber_id: SubscriberId, entity_id: EntityId) -> Self {
        Self {
            subscriber_id,
            entity_id,
            min_quality: Threshold::UNSET,
            min_level: Threshold::UNSET,
            max_distance: Threshold::UNSET,
        }
    }

    pub fn key(&self) -> (SubscriberId, EntityId) {
        (self.subscriber_id, self.entity_id)
    }
}

/// Encounter as read from the external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: String,
    pub entity_id: EntityId,
    pub form: Option<u32>,
    pub latitude: f64,
    pub longitude: f64,
    /// Quality score, 0–100.
    pub quality: f64,
    pub level: Option<u32>,
    pub cp: Option<u32>,
    pub attack: Option<u8>,
    pub defense: Option<u8>,
    pub stamina: Option<u8>,
    pub gender: Option<u8>,
    pub size: Option<u8>,
    pub weather: Option<u8>,
    pub move_1: Option<u32>,
    pub move_2: Option<u32>,
    /// Unix seconds.
    pub expires_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
    /// Raw PvP ranking blob.
    pub pvp: Option<String>,
}

impl Encounter {
    pub const TOP_QUALITY: f64 = 100.0;
    pub const WORST_QUALITY: f64 = 0.0;

    pub fn location(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn is_top_quality(&self) -> bool {
        self.quality == Self::TOP_QUALITY
    }

    pub fn is_worst_quality(&self) -> bool {
        self.quality == Self::WORST_QUALITY
    }
}

/// Persisted expiry of an encounter that produced at least one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterExpiry {
    pub encounter_id: String,
    pub expires_at: i64,
}

/// A sent artifact that may need to be retracted at cleanup time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveredMessage {
    pub chat_id: SubscriberId,
    pub message_id: MessageId,
    pub encounter_id: String,
}
