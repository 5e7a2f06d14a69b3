/// Transport kernel - exchange-agnostic REST and WebSocket plumbing.
///
/// The kernel carries no Deribit-specific logic. It provides:
///
/// - `RestClient`: one-shot HTTP request execution (query-string encoding,
///   bearer authorization, JSON envelope decoding)
/// - `WsSession`: long-lived WebSocket connection management
/// - `WsCodec`: the seam where the exchange dialect encodes subscriptions
///   and decodes inbound frames
///
/// Everything is trait-based so tests can substitute recorded transports.
pub mod codec;
pub mod rest;
pub mod ws;

// Re-export key types for convenience
pub use codec::WsCodec;
pub use rest::{query_string, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use ws::{TungsteniteWs, WsConfig, WsSession};
