use std::collections::BTreeSet;

use metrics::counter;
use tracing::{debug, warn};

use super::{Engine, TickReport};
use crate::model::DeliveredMessage;

impl Engine {
    /// Discard everything recorded for encounters that expired before `now`,
    /// retracting delivered artifacts for subscribers with auto-cleanup.
    pub(super) async fn cleanup(&self, now: i64, report: &mut TickReport) {
        let mut expired: BTreeSet<String> = self.ledger.expired(now).into_iter().collect();

        match self.bounded(self.deliveries.expired_encounters(now)).await {
            Ok(rows) => expired.extend(rows.into_iter().map(|row| row.encounter_id)),
            Err(e) => warn!(error = %e, "Failed to load expired encounters"),
        }

        if expired.is_empty() {
            return;
        }
        debug!(count = expired.len(), "Found expired encounters");

        let snapshot = self.indices.snapshot();
        let mut retracted = 0usize;

        for encounter_id in &expired {
            let messages = match self.bounded(self.deliveries.messages_for(encounter_id)).await {
                Ok(messages) => messages,
                Err(e) => {
                    // Keep the records; the next tick retries.
                    warn!(encounter_id = %encounter_id, error = %e, "Failed to load delivered messages");
                    continue;
                }
            };
            debug!(encounter_id = %encounter_id, messages = messages.len(), "Cleaning up encounter");

            for message in &messages {
                let wants_cleanup = snapshot
                    .subscribers
                    .get(message.chat_id)
                    .is_some_and(|s| s.cleanup);
                if wants_cleanup && self.retract(message).await {
                    retracted += 1;
                }

                if let Err(e) = self.bounded(self.deliveries.delete_message(message)).await {
                    warn!(
                        chat_id = message.chat_id,
                        message_id = message.message_id,
                        error = %e,
                        "Failed to delete message record"
                    );
                }
            }

            if let Err(e) = self.bounded(self.deliveries.delete_encounter(encounter_id)).await {
                warn!(encounter_id = %encounter_id, error = %e, "Failed to delete encounter record");
            }
            self.ledger.remove(encounter_id);
            report.expired += 1;
        }

        counter!("alerts.cleanup.retracted").increment(retracted as u64);
        report.retracted += retracted;
    }

    /// Best effort; failures are logged and never retried.
    async fn retract(&self, message: &DeliveredMessage) -> bool {
        match self
            .bounded(
                self.gateway
                    .delete_message(message.chat_id, message.message_id),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    chat_id = message.chat_id,
                    message_id = message.message_id,
                    error = %e,
                    "Failed to retract message"
                );
                false
            }
        }
    }
}
