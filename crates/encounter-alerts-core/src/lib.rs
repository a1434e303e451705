//! Subscription matching and notification dispatch for encounter alerts.
//!
//! The crate is runtime-agnostic apart from `tokio` timers: storage and the
//! messaging gateway sit behind traits ([`store`], [`gateway`]) and are
//! injected into the [`Engine`].

pub mod engine;
pub mod gateway;
pub mod geo;
pub mod index;
pub mod ledger;
pub mod lookup;
pub mod matching;
pub mod model;
pub mod preferences;
pub mod pvp;
pub mod render;
pub mod store;
pub mod threshold;

pub use engine::{Engine, EngineParts, EngineSettings, TickReport};
pub use gateway::{GatewayError, MessageGateway};
pub use index::{IndexSnapshot, Indices};
pub use ledger::DeliveryLedger;
pub use lookup::{LookupError, NameTable};
pub use model::{
    DeliveredMessage, Encounter, EncounterExpiry, EntityId, MessageId, Subscriber, SubscriberId,
    Subscription,
};
pub use preferences::Preferences;
pub use store::{DeliveryStore, EncounterSource, PreferenceStore, StoreError};
pub use threshold::Threshold;
