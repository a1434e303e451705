//! Messaging gateway seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{MessageId, SubscriberId};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("gateway transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The gateway answered and refused the call.
    #[error("gateway rejected {method}: [{code}] {description}")]
    Api {
        method: &'static str,
        code: i64,
        description: String,
    },

    /// The response could not be decoded.
    #[error("unexpected gateway response for {method}: {message}")]
    Decode {
        method: &'static str,
        message: String,
    },

    #[error("gateway call timed out")]
    Timeout,
}

impl From<tokio::time::error::Elapsed> for GatewayError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Outbound messaging operations used by dispatch and cleanup.
///
/// Every send returns the identifier needed to retract the artifact later.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Markdown-formatted text message.
    async fn send_text(&self, chat_id: SubscriberId, text: &str) -> Result<MessageId>;

    /// Media attachment fetched by the gateway from `url`.
    async fn send_media(&self, chat_id: SubscriberId, url: &str) -> Result<MessageId>;

    async fn send_location(
        &self,
        chat_id: SubscriberId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageId>;

    /// Location pin with a title and a caption in one artifact.
    async fn send_venue(
        &self,
        chat_id: SubscriberId,
        latitude: f64,
        longitude: f64,
        title: &str,
        address: &str,
    ) -> Result<MessageId>;

    async fn delete_message(&self, chat_id: SubscriberId, message_id: MessageId) -> Result<()>;
}
