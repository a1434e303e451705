use async_trait::async_trait;
use encounter_alerts_core::store::{EncounterSource, Result, StoreError};
use encounter_alerts_core::Encounter;
use sqlx::MySqlPool;
use tracing::warn;

use crate::rows::{ScannerRow, SCANNER_COLUMNS};

/// Read-only view of the scanner's `pokemon` table.
#[derive(Debug, Clone)]
pub struct ScannerSource {
    pool: MySqlPool,
}

impl ScannerSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl EncounterSource for ScannerSource {
    #[tracing::instrument(skip(self))]
    async fn recent_encounters(&self, since: i64) -> Result<Vec<Encounter>> {
        let rows: Vec<ScannerRow> = sqlx::query_as(&format!(
            "SELECT {SCANNER_COLUMNS} FROM pokemon \
             WHERE iv IS NOT NULL AND updated > ? AND expire_timestamp > ?"
        ))
        .bind(since)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        // One bad row must not hide the rest of the batch.
        let mut encounters = Vec::with_capacity(rows.len());
        for row in rows {
            match Encounter::try_from(row) {
                Ok(encounter) => encounters.push(encounter),
                Err(e) => warn!(error = %e, "Skipping scanner row"),
            }
        }
        Ok(encounters)
    }
}
