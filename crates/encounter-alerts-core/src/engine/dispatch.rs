use metrics::{counter, gauge};
use tracing::{debug, error, info, warn};

use super::{Engine, TickReport};
use crate::gateway;
use crate::matching::{plan, MatchReason};
use crate::model::{DeliveredMessage, Encounter, MessageId, Subscriber};
use crate::pvp;
use crate::render::{render, sticker_url};

impl Engine {
    /// Poll recent encounters and notify every matching subscriber that has
    /// not been notified about that encounter yet.
    pub(super) async fn dispatch(&self, now: i64, report: &mut TickReport) {
        let since = now - self.settings.lookback.as_secs() as i64;

        let encounters = match self.bounded(self.source.recent_encounters(since)).await {
            Ok(encounters) => encounters,
            Err(e) => {
                error!(error = %e, "Failed to fetch encounters");
                return;
            }
        };

        gauge!("alerts.encounters").set(encounters.len() as f64);
        info!(count = encounters.len(), "Fetched encounters");
        report.encounters += encounters.len();

        for encounter in &encounters {
            // Cleanup already settled these; a claim now would never be released.
            if encounter.expires_at < now {
                debug!(encounter_id = %encounter.id, "Skipping expired encounter");
                continue;
            }
            pvp::log_top_ranks(&self.names, encounter);

            // Fresh snapshot per encounter so a rebuild published mid-tick
            // applies to the remaining encounters.
            let snapshot = self.indices.snapshot();
            for planned in plan(&snapshot, encounter) {
                if let Some(sent) = self
                    .notify(planned.subscriber, planned.reason, encounter, now)
                    .await
                {
                    report.notified += 1;
                    report.messages += sent;
                }
            }
        }
    }

    /// Claim the (encounter, subscriber) pair and send the notification.
    ///
    /// Returns the number of artifacts sent, or `None` if the pair was
    /// already claimed. The claim happens before any send, so a failed send
    /// is not retried on a later tick.
    async fn notify(
        &self,
        subscriber: &Subscriber,
        reason: MatchReason,
        encounter: &Encounter,
        now: i64,
    ) -> Option<usize> {
        if !self
            .ledger
            .claim(&encounter.id, subscriber.id, encounter.expires_at)
        {
            debug!(
                encounter_id = %encounter.id,
                subscriber_id = subscriber.id,
                "Already notified"
            );
            return None;
        }

        info!(
            encounter_id = %encounter.id,
            entity_id = encounter.entity_id,
            subscriber_id = subscriber.id,
            reason = %reason,
            "Sending notification"
        );
        counter!("alerts.notifications", "reason" => reason.as_str()).increment(1);

        if let Err(e) = self
            .bounded(
                self.deliveries
                    .record_encounter(&encounter.id, encounter.expires_at),
            )
            .await
        {
            warn!(encounter_id = %encounter.id, error = %e, "Failed to record encounter expiry");
        }

        let notification = render(&self.names, subscriber, encounter, now);
        let chat = subscriber.id;
        let mut sent = 0;

        if subscriber.only_map {
            let venue = self.gateway.send_venue(
                chat,
                encounter.latitude,
                encounter.longitude,
                &notification.title,
                &notification.body,
            );
            sent += self.settle("venue", venue, subscriber, encounter).await;
            return Some(sent);
        }

        if subscriber.stickers {
            let url = sticker_url(&self.settings.sticker_base_url, &self.names, encounter);
            let media = self.gateway.send_media(chat, &url);
            sent += self.settle("media", media, subscriber, encounter).await;
        }

        let location = self
            .gateway
            .send_location(chat, encounter.latitude, encounter.longitude);
        sent += self.settle("location", location, subscriber, encounter).await;

        let text = notification.text();
        let message = self.gateway.send_text(chat, &text);
        sent += self.settle("text", message, subscriber, encounter).await;

        Some(sent)
    }

    /// Await one send and record the artifact for cleanup. Returns 1 if the
    /// artifact was sent.
    async fn settle<F>(
        &self,
        kind: &'static str,
        send: F,
        subscriber: &Subscriber,
        encounter: &Encounter,
    ) -> usize
    where
        F: std::future::Future<Output = gateway::Result<MessageId>>,
    {
        let message_id = match self.bounded(send).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    encounter_id = %encounter.id,
                    subscriber_id = subscriber.id,
                    kind,
                    error = %e,
                    "Failed to send notification artifact"
                );
                return 0;
            }
        };
        counter!("alerts.messages", "kind" => kind).increment(1);

        let record = DeliveredMessage {
            chat_id: subscriber.id,
            message_id,
            encounter_id: encounter.id.clone(),
        };
        if let Err(e) = self.bounded(self.deliveries.record_message(&record)).await {
            warn!(
                encounter_id = %encounter.id,
                subscriber_id = subscriber.id,
                message_id,
                error = %e,
                "Failed to record delivered message"
            );
        }
        1
    }
}
