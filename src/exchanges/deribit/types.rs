use serde::Serialize;
use serde_json::Value;

/// Outbound JSON-RPC 2.0 request envelope
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: P,
}

/// Params of a subscribe/unsubscribe call: the access token plus the
/// channel list
#[derive(Debug, Serialize)]
pub struct SubscribeParams {
    pub access_token: String,
    pub channels: Vec<String>,
}

/// Decoded inbound WebSocket frame
#[derive(Debug, Clone)]
pub enum DeribitWsEvent {
    /// Channel notification (`method == "subscription"`)
    Notification {
        channel: String,
        data: Value,
        /// Server send time in ms since epoch, when the data carries one
        timestamp: Option<i64>,
    },
    /// Reply to an RPC call made on this connection (e.g. the subscribe ack)
    CallResult { id: Option<u64>, result: Value },
    /// Any other well-formed frame, passed through untouched
    Raw(Value),
}

/// A decoded message as delivered by the receive loop, in wire order
#[derive(Debug, Clone)]
pub struct StreamUpdate {
    pub event: DeribitWsEvent,
    /// Client receive time minus the server timestamp, when present
    pub propagation_delay_ms: Option<i64>,
}

/// Pull the access token out of an authentication response envelope.
///
/// `None` when either nested key is absent - the caller treats that as an
/// authentication failure.
pub fn extract_access_token(envelope: &Value) -> Option<&str> {
    envelope.get("result")?.get("access_token")?.as_str()
}
