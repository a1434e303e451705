//! Raw rows as selected from MySQL and their mapping onto domain records.
//!
//! Every integer column is selected through `CAST(.. AS SIGNED)` so the rows
//! decode identically whatever width or signedness the live schema uses.

use encounter_alerts_core::store::StoreError;
use encounter_alerts_core::{Encounter, EncounterExpiry, Subscriber, Subscription, Threshold};

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub notify: i64,
    pub language: String,
    pub stickers: i64,
    pub only_map: i64,
    pub cleanup: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub max_distance: i64,
    pub hundo_iv: i64,
    pub zero_iv: i64,
    pub min_iv: i64,
    pub min_level: i64,
}

pub(crate) const USER_COLUMNS: &str = "id, \
    CAST(notify AS SIGNED) AS notify, \
    language, \
    CAST(stickers AS SIGNED) AS stickers, \
    CAST(only_map AS SIGNED) AS only_map, \
    CAST(cleanup AS SIGNED) AS cleanup, \
    latitude, \
    longitude, \
    CAST(max_distance AS SIGNED) AS max_distance, \
    CAST(hundo_iv AS SIGNED) AS hundo_iv, \
    CAST(zero_iv AS SIGNED) AS zero_iv, \
    CAST(min_iv AS SIGNED) AS min_iv, \
    CAST(min_level AS SIGNED) AS min_level";

impl From<UserRow> for Subscriber {
    fn from(row: UserRow) -> Self {
        Subscriber {
            id: row.id,
            notify: row.notify != 0,
            language: row.language,
            stickers: row.stickers != 0,
            only_map: row.only_map != 0,
            cleanup: row.cleanup != 0,
            latitude: row.latitude,
            longitude: row.longitude,
            max_distance: Threshold::from_signed(row.max_distance),
            top_quality: row.hundo_iv != 0,
            worst_quality: row.zero_iv != 0,
            min_quality: Threshold::from_signed(row.min_iv),
            min_level: Threshold::from_signed(row.min_level),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubscriptionRow {
    pub user_id: i64,
    pub pokemon_id: i64,
    pub min_iv: i64,
    pub min_level: i64,
    pub max_distance: i64,
}

pub(crate) const SUBSCRIPTION_COLUMNS: &str = "user_id, \
    CAST(pokemon_id AS SIGNED) AS pokemon_id, \
    CAST(min_iv AS SIGNED) AS min_iv, \
    CAST(min_level AS SIGNED) AS min_level, \
    CAST(max_distance AS SIGNED) AS max_distance";

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let entity_id = u32::try_from(row.pokemon_id).map_err(|_| StoreError::InvalidRow {
            table: "subscriptions",
            message: format!("pokemon_id {} out of range", row.pokemon_id),
        })?;
        Ok(Subscription {
            subscriber_id: row.user_id,
            entity_id,
            min_quality: Threshold::from_signed(row.min_iv),
            min_level: Threshold::from_signed(row.min_level),
            max_distance: Threshold::from_signed(row.max_distance),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ExpiryRow {
    pub id: String,
    pub expiration: i64,
}

impl From<ExpiryRow> for EncounterExpiry {
    fn from(row: ExpiryRow) -> Self {
        EncounterExpiry {
            encounter_id: row.id,
            expires_at: row.expiration,
        }
    }
}

/// Row of the scanner's `pokemon` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ScannerRow {
    pub id: String,
    pub pokemon_id: i64,
    pub form: Option<i64>,
    pub lat: f64,
    pub lon: f64,
    pub iv: f64,
    pub level: Option<i64>,
    pub cp: Option<i64>,
    pub atk_iv: Option<i64>,
    pub def_iv: Option<i64>,
    pub sta_iv: Option<i64>,
    pub gender: Option<i64>,
    pub size: Option<i64>,
    pub weather: Option<i64>,
    pub move_1: Option<i64>,
    pub move_2: Option<i64>,
    pub expire_timestamp: i64,
    pub updated: i64,
    pub pvp: Option<String>,
}

pub(crate) const SCANNER_COLUMNS: &str = "CAST(id AS CHAR) AS id, \
    CAST(pokemon_id AS SIGNED) AS pokemon_id, \
    CAST(form AS SIGNED) AS form, \
    CAST(lat AS DOUBLE) AS lat, \
    CAST(lon AS DOUBLE) AS lon, \
    CAST(iv AS DOUBLE) AS iv, \
    CAST(level AS SIGNED) AS level, \
    CAST(cp AS SIGNED) AS cp, \
    CAST(atk_iv AS SIGNED) AS atk_iv, \
    CAST(def_iv AS SIGNED) AS def_iv, \
    CAST(sta_iv AS SIGNED) AS sta_iv, \
    CAST(gender AS SIGNED) AS gender, \
    CAST(size AS SIGNED) AS size, \
    CAST(weather AS SIGNED) AS weather, \
    CAST(move_1 AS SIGNED) AS move_1, \
    CAST(move_2 AS SIGNED) AS move_2, \
    CAST(expire_timestamp AS SIGNED) AS expire_timestamp, \
    CAST(updated AS SIGNED) AS updated, \
    pvp";

impl TryFrom<ScannerRow> for Encounter {
    type Error = StoreError;

    fn try_from(row: ScannerRow) -> Result<Self, Self::Error> {
        let entity_id = u32::try_from(row.pokemon_id).map_err(|_| StoreError::InvalidRow {
            table: "pokemon",
            message: format!("pokemon_id {} out of range for {}", row.pokemon_id, row.id),
        })?;

        Ok(Encounter {
            id: row.id,
            entity_id,
            form: narrow(row.form),
            latitude: row.lat,
            longitude: row.lon,
            quality: row.iv,
            level: narrow(row.level),
            cp: narrow(row.cp),
            attack: narrow(row.atk_iv),
            defense: narrow(row.def_iv),
            stamina: narrow(row.sta_iv),
            gender: narrow(row.gender),
            size: narrow(row.size),
            weather: narrow(row.weather),
            move_1: narrow(row.move_1),
            move_2: narrow(row.move_2),
            expires_at: row.expire_timestamp,
            updated_at: row.updated,
            pvp: row.pvp,
        })
    }
}

/// Out-of-range values are treated as missing.
fn narrow<T: TryFrom<i64>>(value: Option<i64>) -> Option<T> {
    value.and_then(|v| T::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner_row() -> ScannerRow {
        ScannerRow {
            id: "12345678901234567890".to_string(),
            pokemon_id: 16,
            form: Some(0),
            lat: 52.52,
            lon: 13.405,
            iv: 97.78,
            level: Some(35),
            cp: Some(1234),
            atk_iv: Some(15),
            def_iv: Some(14),
            sta_iv: Some(15),
            gender: Some(2),
            size: None,
            weather: Some(300),
            move_1: Some(221),
            move_2: None,
            expire_timestamp: 1_700_000_600,
            updated: 1_700_000_000,
            pvp: None,
        }
    }

    #[test]
    fn user_row_zero_means_unset() {
        let subscriber: Subscriber = UserRow {
            id: -1001234,
            notify: 1,
            language: "en".to_string(),
            stickers: 0,
            only_map: 1,
            cleanup: 1,
            latitude: 0.0,
            longitude: 0.0,
            max_distance: 0,
            hundo_iv: 1,
            zero_iv: 0,
            min_iv: 90,
            min_level: 0,
        }
        .into();

        assert!(subscriber.notify);
        assert!(!subscriber.stickers);
        assert!(subscriber.only_map);
        assert!(subscriber.top_quality);
        assert!(!subscriber.worst_quality);
        assert_eq!(subscriber.max_distance, Threshold::UNSET);
        assert_eq!(subscriber.min_quality.get(), Some(90));
        assert_eq!(subscriber.min_level, Threshold::UNSET);
    }

    #[test]
    fn subscription_row_rejects_negative_entity() {
        let row = SubscriptionRow {
            user_id: 1,
            pokemon_id: -4,
            min_iv: 0,
            min_level: 0,
            max_distance: 0,
        };
        assert!(matches!(
            Subscription::try_from(row),
            Err(StoreError::InvalidRow {
                table: "subscriptions",
                ..
            })
        ));
    }

    #[test]
    fn scanner_row_narrows_attributes() {
        let encounter = Encounter::try_from(scanner_row()).unwrap();
        assert_eq!(encounter.entity_id, 16);
        assert_eq!(encounter.form, Some(0));
        assert_eq!(encounter.attack, Some(15));
        assert_eq!(encounter.gender, Some(2));
        // does not fit a u8
        assert_eq!(encounter.weather, None);
        assert_eq!(encounter.move_2, None);
        assert_eq!(encounter.expires_at, 1_700_000_600);
    }
}
