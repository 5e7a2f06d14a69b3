use crate::core::errors::ExchangeError;
use crate::core::kernel::WsCodec;
use crate::exchanges::deribit::types::{DeribitWsEvent, JsonRpcRequest, SubscribeParams};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Deribit WebSocket codec.
///
/// Frames are JSON-RPC 2.0: subscriptions go out as `private/subscribe`
/// carrying the access token, notifications come back with
/// `method == "subscription"` and the payload under `params.data`.
pub struct DeribitCodec {
    access_token: String,
}

impl DeribitCodec {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    fn encode_call(
        &self,
        method: &'static str,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, ExchangeError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params: SubscribeParams {
                access_token: self.access_token.clone(),
                channels: channels.iter().map(|c| c.as_ref().to_string()).collect(),
            },
        };

        let json_str = serde_json::to_string(&request).map_err(|e| {
            ExchangeError::SerializationError(format!("Failed to encode subscription: {}", e))
        })?;

        Ok(Message::Text(json_str))
    }

    fn classify(value: Value) -> DeribitWsEvent {
        let is_notification = value.get("method").and_then(|m| m.as_str()) == Some("subscription");

        if is_notification {
            if let Some(params) = value.get("params") {
                let channel = params
                    .get("channel")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string();
                let data = params.get("data").cloned().unwrap_or(Value::Null);
                let timestamp = data.get("timestamp").and_then(|t| t.as_i64());
                return DeribitWsEvent::Notification {
                    channel,
                    data,
                    timestamp,
                };
            }
        }

        if let Some(result) = value.get("result") {
            return DeribitWsEvent::CallResult {
                id: value.get("id").and_then(|i| i.as_u64()),
                result: result.clone(),
            };
        }

        DeribitWsEvent::Raw(value)
    }
}

impl WsCodec for DeribitCodec {
    type Message = DeribitWsEvent;

    fn encode_subscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, ExchangeError> {
        self.encode_call("private/subscribe", channels)
    }

    fn encode_unsubscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, ExchangeError> {
        self.encode_call("private/unsubscribe", channels)
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        match message {
            Message::Text(text) => {
                // A frame that is not valid JSON ends the receive loop
                let value: Value = serde_json::from_str(&text).map_err(|e| {
                    ExchangeError::DeserializationError(format!(
                        "Failed to parse WebSocket frame: {}",
                        e
                    ))
                })?;

                Ok(Some(Self::classify(value)))
            }
            // Deribit uses text frames; anything else is ignored
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(codec: &DeribitCodec, value: Value) -> DeribitWsEvent {
        codec
            .decode_message(Message::Text(value.to_string()))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn subscription_request_carries_token_and_single_channel() {
        let codec = DeribitCodec::new("tok");
        let message = codec
            .encode_subscription(&["book.BTC-PERPETUAL.raw"])
            .unwrap();
        let Message::Text(text) = message else {
            panic!("expected text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "private/subscribe");
        assert_eq!(value["params"]["access_token"], "tok");
        assert_eq!(value["params"]["channels"], json!(["book.BTC-PERPETUAL.raw"]));
    }

    #[test]
    fn unsubscription_uses_private_unsubscribe() {
        let codec = DeribitCodec::new("tok");
        let Message::Text(text) = codec
            .encode_unsubscription(&["book.BTC-PERPETUAL.raw"])
            .unwrap()
        else {
            panic!("expected text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["method"], "private/unsubscribe");
    }

    #[test]
    fn notification_with_timestamp_is_decoded() {
        let codec = DeribitCodec::new("tok");
        let event = decode(
            &codec,
            json!({
                "jsonrpc": "2.0",
                "method": "subscription",
                "params": {
                    "channel": "book.BTC-PERPETUAL.100ms",
                    "data": {"timestamp": 1_700_000_000_123_i64, "bids": [], "asks": []}
                }
            }),
        );
        match event {
            DeribitWsEvent::Notification {
                channel, timestamp, ..
            } => {
                assert_eq!(channel, "book.BTC-PERPETUAL.100ms");
                assert_eq!(timestamp, Some(1_700_000_000_123));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn notification_without_timestamp_has_none() {
        let codec = DeribitCodec::new("tok");
        let event = decode(
            &codec,
            json!({
                "method": "subscription",
                "params": {"channel": "book.ETH-PERPETUAL.agg2", "data": {"bids": []}}
            }),
        );
        match event {
            DeribitWsEvent::Notification { timestamp, .. } => assert_eq!(timestamp, None),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn call_result_frames_are_classified() {
        let codec = DeribitCodec::new("tok");
        let event = decode(
            &codec,
            json!({"jsonrpc": "2.0", "id": 1, "result": ["book.BTC-PERPETUAL.raw"]}),
        );
        match event {
            DeribitWsEvent::CallResult { id, result } => {
                assert_eq!(id, Some(1));
                assert_eq!(result, json!(["book.BTC-PERPETUAL.raw"]));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let codec = DeribitCodec::new("tok");
        let result = codec.decode_message(Message::Text("not json".to_string()));
        assert!(matches!(
            result,
            Err(ExchangeError::DeserializationError(_))
        ));
    }

    #[test]
    fn binary_frames_are_ignored() {
        let codec = DeribitCodec::new("tok");
        let result = codec.decode_message(Message::Binary(vec![1, 2, 3])).unwrap();
        assert!(result.is_none());
    }
}
