//! Telegram Bot API implementation of [`MessageGateway`].
//!
//! Every call is a JSON `POST {api_url}/bot{token}/{method}`. Stickers and
//! location pins are sent silently so only the text message produces a
//! notification sound on the subscriber's device.

use std::time::Duration;

use async_trait::async_trait;
use encounter_alerts_core::gateway::Result;
use encounter_alerts_core::{GatewayError, MessageGateway, MessageId, SubscriberId};
use serde_json::{json, Value};
use tracing::debug;

mod api;
pub mod http;

use api::SentMessage;
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};

pub struct TelegramGateway<C = ReqwestHttpClient> {
    client: C,
    base: String,
}

impl TelegramGateway<ReqwestHttpClient> {
    /// Gateway over reqwest with a per-request `timeout`.
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(
            ReqwestHttpClient::new(timeout)?,
            api_url,
            token,
        ))
    }
}

impl<C: HttpClient> TelegramGateway<C> {
    pub fn with_client(client: C, api_url: &str, token: &str) -> Self {
        Self {
            client,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        payload: Value,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base, method);
        let response = self.client.post_json(&url, &payload).await?;
        debug!(method, status = response.status, "Bot API call completed");
        api::decode(method, &response)
    }

    async fn send(&self, method: &'static str, payload: Value) -> Result<MessageId> {
        let sent: SentMessage = self.call(method, payload).await?;
        Ok(sent.message_id)
    }
}

impl<C> std::fmt::Debug for TelegramGateway<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // base embeds the token
        f.debug_struct("TelegramGateway").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: HttpClient> MessageGateway for TelegramGateway<C> {
    async fn send_text(&self, chat_id: SubscriberId, text: &str) -> Result<MessageId> {
        self.send(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }),
        )
        .await
    }

    async fn send_media(&self, chat_id: SubscriberId, url: &str) -> Result<MessageId> {
        self.send(
            "sendSticker",
            json!({
                "chat_id": chat_id,
                "sticker": url,
                "disable_notification": true,
            }),
        )
        .await
    }

    async fn send_location(
        &self,
        chat_id: SubscriberId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageId> {
        self.send(
            "sendLocation",
            json!({
                "chat_id": chat_id,
                "latitude": latitude,
                "longitude": longitude,
                "disable_notification": true,
            }),
        )
        .await
    }

    async fn send_venue(
        &self,
        chat_id: SubscriberId,
        latitude: f64,
        longitude: f64,
        title: &str,
        address: &str,
    ) -> Result<MessageId> {
        self.send(
            "sendVenue",
            json!({
                "chat_id": chat_id,
                "latitude": latitude,
                "longitude": longitude,
                "title": title,
                "address": address,
            }),
        )
        .await
    }

    async fn delete_message(&self, chat_id: SubscriberId, message_id: MessageId) -> Result<()> {
        let deleted: bool = self
            .call(
                "deleteMessage",
                json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                }),
            )
            .await?;

        if deleted {
            Ok(())
        } else {
            Err(GatewayError::Decode {
                method: "deleteMessage",
                message: "result was false".to_string(),
            })
        }
    }
}
