//! Bot API response envelope.

use encounter_alerts_core::{GatewayError, MessageId};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::http::HttpResponse;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: MessageId,
}

/// Decode a Bot API response for `method`.
///
/// `ok = false` maps to [`GatewayError::Api`] whatever the HTTP status;
/// a body that is not an envelope maps to [`GatewayError::Decode`].
pub(crate) fn decode<T: DeserializeOwned>(
    method: &'static str,
    response: &HttpResponse,
) -> Result<T, GatewayError> {
    let envelope: Envelope<T> =
        serde_json::from_slice(&response.body).map_err(|e| GatewayError::Decode {
            method,
            message: format!("HTTP {}: {}", response.status, e),
        })?;

    if !envelope.ok {
        return Err(GatewayError::Api {
            method,
            code: envelope.error_code.unwrap_or_else(|| i64::from(response.status)),
            description: envelope
                .description
                .unwrap_or_else(|| "no description".to_string()),
        });
    }

    envelope.result.ok_or_else(|| GatewayError::Decode {
        method,
        message: "missing result".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn decodes_sent_message() {
        let sent: SentMessage = decode(
            "sendMessage",
            &response(200, r#"{"ok":true,"result":{"message_id":77,"chat":{"id":1}}}"#),
        )
        .unwrap();
        assert_eq!(sent.message_id, 77);
    }

    #[test]
    fn decodes_boolean_result() {
        let deleted: bool = decode("deleteMessage", &response(200, r#"{"ok":true,"result":true}"#))
            .unwrap();
        assert!(deleted);
    }

    #[test]
    fn refusal_maps_to_api_error() {
        let err = decode::<SentMessage>(
            "sendMessage",
            &response(
                403,
                r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
            ),
        )
        .unwrap_err();

        match err {
            GatewayError::Api {
                method,
                code,
                description,
            } => {
                assert_eq!(method, "sendMessage");
                assert_eq!(code, 403);
                assert!(description.contains("blocked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn refusal_without_code_uses_http_status() {
        let err = decode::<SentMessage>("sendVenue", &response(429, r#"{"ok":false}"#)).unwrap_err();
        assert!(matches!(err, GatewayError::Api { code: 429, .. }));
    }

    #[test]
    fn non_json_body_is_decode_error() {
        let err = decode::<SentMessage>("sendSticker", &response(502, "<html>Bad Gateway</html>"))
            .unwrap_err();
        match err {
            GatewayError::Decode { method, message } => {
                assert_eq!(method, "sendSticker");
                assert!(message.starts_with("HTTP 502"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ok_without_result_is_decode_error() {
        let err = decode::<SentMessage>("sendLocation", &response(200, r#"{"ok":true}"#))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }
}
