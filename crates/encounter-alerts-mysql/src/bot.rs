use async_trait::async_trait;
use encounter_alerts_core::store::{DeliveryStore, PreferenceStore, Result, StoreError};
use encounter_alerts_core::{
    DeliveredMessage, EncounterExpiry, EntityId, Subscriber, SubscriberId, Subscription,
};
use sqlx::MySqlPool;
use tracing::debug;

use crate::rows::{
    ExpiryRow, SubscriptionRow, UserRow, SUBSCRIPTION_COLUMNS, USER_COLUMNS,
};

/// Bot database: subscriber preferences and delivery records.
///
/// Table and column names match the schema the existing bot database was
/// created with, so [`migrate`](Self::migrate) is a no-op against it.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Create the bot tables if they do not exist.
    #[tracing::instrument(skip(self))]
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id           BIGINT       NOT NULL PRIMARY KEY,
                notify       TINYINT(1)   NOT NULL DEFAULT 1,
                language     VARCHAR(5)   NOT NULL DEFAULT 'de',
                stickers     TINYINT(1)   NOT NULL DEFAULT 1,
                only_map     TINYINT(1)   NOT NULL DEFAULT 0,
                cleanup      TINYINT(1)   NOT NULL DEFAULT 1,
                latitude     DOUBLE       NOT NULL DEFAULT 0,
                longitude    DOUBLE       NOT NULL DEFAULT 0,
                max_distance MEDIUMINT    NOT NULL DEFAULT 0,
                hundo_iv     TINYINT(1)   NOT NULL DEFAULT 0,
                zero_iv      TINYINT(1)   NOT NULL DEFAULT 0,
                min_iv       TINYINT      NOT NULL DEFAULT 0,
                min_level    TINYINT      NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS subscriptions (
                user_id      BIGINT    NOT NULL,
                pokemon_id   INT       NOT NULL,
                min_iv       TINYINT   NOT NULL DEFAULT 0,
                min_level    TINYINT   NOT NULL DEFAULT 0,
                max_distance MEDIUMINT NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, pokemon_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS encounters (
                id         VARCHAR(25) NOT NULL PRIMARY KEY,
                expiration BIGINT      NOT NULL,
                INDEX idx_encounters_expiration (expiration)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                chat_id      BIGINT      NOT NULL,
                message_id   BIGINT      NOT NULL,
                encounter_id VARCHAR(25) NOT NULL,
                PRIMARY KEY (chat_id, message_id),
                INDEX idx_messages_encounter_id (encounter_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        Ok(row.map(Subscriber::from))
    }

    async fn fetch_subscriptions(&self, filter: Option<SubscriberId>) -> Result<Vec<Subscription>> {
        let rows: Vec<SubscriptionRow> = match filter {
            Some(id) => sqlx::query_as(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = ? ORDER BY pokemon_id"
            ))
            .bind(id)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions"
            ))
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(StoreError::backend)?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

#[async_trait]
impl PreferenceStore for MySqlStore {
    #[tracing::instrument(skip(self))]
    async fn subscribers(&self) -> Result<Vec<Subscriber>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users"))
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        debug!(count = rows.len(), "Loaded subscribers");
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        self.fetch_subscriptions(None).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_or_create_subscriber(&self, id: SubscriberId) -> Result<Subscriber> {
        sqlx::query("INSERT IGNORE INTO users (id) VALUES (?)")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        self.fetch_subscriber(id)
            .await?
            .ok_or_else(|| StoreError::InvalidRow {
                table: "users",
                message: format!("subscriber {} missing after insert", id),
            })
    }

    #[tracing::instrument(skip(self, subscriber), fields(subscriber_id = subscriber.id))]
    async fn save_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO users
                (id, notify, language, stickers, only_map, cleanup, latitude, longitude,
                 max_distance, hundo_iv, zero_iv, min_iv, min_level)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                notify = VALUES(notify),
                language = VALUES(language),
                stickers = VALUES(stickers),
                only_map = VALUES(only_map),
                cleanup = VALUES(cleanup),
                latitude = VALUES(latitude),
                longitude = VALUES(longitude),
                max_distance = VALUES(max_distance),
                hundo_iv = VALUES(hundo_iv),
                zero_iv = VALUES(zero_iv),
                min_iv = VALUES(min_iv),
                min_level = VALUES(min_level)
            ",
        )
        .bind(subscriber.id)
        .bind(subscriber.notify)
        .bind(&subscriber.language)
        .bind(subscriber.stickers)
        .bind(subscriber.only_map)
        .bind(subscriber.cleanup)
        .bind(subscriber.latitude)
        .bind(subscriber.longitude)
        .bind(i64::from(subscriber.max_distance.raw()))
        .bind(subscriber.top_quality)
        .bind(subscriber.worst_quality)
        .bind(i64::from(subscriber.min_quality.raw()))
        .bind(i64::from(subscriber.min_level.raw()))
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO subscriptions (user_id, pokemon_id, min_iv, min_level, max_distance)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                min_iv = VALUES(min_iv),
                min_level = VALUES(min_level),
                max_distance = VALUES(max_distance)
            ",
        )
        .bind(subscription.subscriber_id)
        .bind(i64::from(subscription.entity_id))
        .bind(i64::from(subscription.min_quality.raw()))
        .bind(i64::from(subscription.min_level.raw()))
        .bind(i64::from(subscription.max_distance.raw()))
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_subscription(
        &self,
        subscriber_id: SubscriberId,
        entity_id: EntityId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND pokemon_id = ?")
            .bind(subscriber_id)
            .bind(i64::from(entity_id))
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn clear_subscriptions(&self, subscriber_id: SubscriberId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ?")
            .bind(subscriber_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn subscriptions_for(&self, subscriber_id: SubscriberId) -> Result<Vec<Subscription>> {
        self.fetch_subscriptions(Some(subscriber_id)).await
    }
}

#[async_trait]
impl DeliveryStore for MySqlStore {
    #[tracing::instrument(skip(self))]
    async fn record_encounter(&self, encounter_id: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO encounters (id, expiration) VALUES (?, ?)
            ON DUPLICATE KEY UPDATE expiration = VALUES(expiration)
            ",
        )
        .bind(encounter_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn record_message(&self, message: &DeliveredMessage) -> Result<()> {
        sqlx::query(
            "INSERT IGNORE INTO messages (chat_id, message_id, encounter_id) VALUES (?, ?, ?)",
        )
        .bind(message.chat_id)
        .bind(message.message_id)
        .bind(&message.encounter_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn expired_encounters(&self, now: i64) -> Result<Vec<EncounterExpiry>> {
        let rows: Vec<ExpiryRow> = sqlx::query_as(
            "SELECT id, CAST(expiration AS SIGNED) AS expiration FROM encounters WHERE expiration < ? ORDER BY id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(rows.into_iter().map(EncounterExpiry::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn messages_for(&self, encounter_id: &str) -> Result<Vec<DeliveredMessage>> {
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            r"
            SELECT chat_id, CAST(message_id AS SIGNED) AS message_id, encounter_id
            FROM messages
            WHERE encounter_id = ?
            ORDER BY chat_id, message_id
            ",
        )
        .bind(encounter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows
            .into_iter()
            .map(|(chat_id, message_id, encounter_id)| DeliveredMessage {
                chat_id,
                message_id,
                encounter_id,
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_message(&self, message: &DeliveredMessage) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE chat_id = ? AND message_id = ?")
            .bind(message.chat_id)
            .bind(message.message_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_encounter(&self, encounter_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM encounters WHERE id = ?")
            .bind(encounter_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}
