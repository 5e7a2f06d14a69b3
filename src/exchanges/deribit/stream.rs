use crate::core::errors::ExchangeError;
use crate::core::kernel::{TungsteniteWs, WsSession};
use crate::core::types::BookCadence;
use crate::exchanges::deribit::codec::DeribitCodec;
use crate::exchanges::deribit::types::{DeribitWsEvent, StreamUpdate};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Lifecycle of one streaming session. `Closed` is terminal and reachable
/// from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unconnected,
    Connected,
    Subscribed,
    Receiving,
    Closed,
}

/// One market-data subscription over one WebSocket connection.
///
/// The receive loop runs on its own task and hands decoded messages to the
/// caller through a bounded channel, in the exact order they arrived on the
/// wire. The first read or decode error ends the loop; there is no
/// reconnect.
pub struct MarketStream<S: WsSession<DeribitCodec>> {
    session: S,
    state: StreamState,
}

impl MarketStream<TungsteniteWs<DeribitCodec>> {
    /// Connect to `wss://{host}:{port}/ws/api/v2`.
    ///
    /// The token is carried by the codec for the subscription handshake.
    /// Resolution, TLS negotiation (with `host` as the SNI name), and the
    /// WebSocket handshake all happen here; any failure is fatal to the
    /// session.
    pub async fn open(
        host: &str,
        port: u16,
        access_token: impl Into<String>,
    ) -> Result<Self, ExchangeError> {
        let url = format!("wss://{}:{}/ws/api/v2", host, port);
        let codec = DeribitCodec::new(access_token);
        let session = TungsteniteWs::new(url, "deribit".to_string(), codec);

        let mut stream = Self::with_session(session);
        stream.connect().await?;
        Ok(stream)
    }
}

impl<S: WsSession<DeribitCodec>> MarketStream<S> {
    /// Wrap an existing session (used by tests to inject a scripted one)
    pub fn with_session(session: S) -> Self {
        Self {
            session,
            state: StreamState::Unconnected,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Establish the connection. Valid only once, from `Unconnected`.
    pub async fn connect(&mut self) -> Result<(), ExchangeError> {
        if self.state != StreamState::Unconnected {
            return Err(ExchangeError::InvalidState(format!(
                "connect is only valid when unconnected (state: {:?})",
                self.state
            )));
        }

        match self.session.connect().await {
            Ok(()) => {
                self.state = StreamState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = StreamState::Closed;
                Err(e)
            }
        }
    }

    /// Subscribe to the book channel for `instrument` at `cadence`.
    ///
    /// Returns the channel name that was subscribed.
    pub async fn subscribe(
        &mut self,
        instrument: &str,
        cadence: BookCadence,
    ) -> Result<String, ExchangeError> {
        if self.state != StreamState::Connected {
            return Err(ExchangeError::InvalidState(format!(
                "subscribe requires a connected session (state: {:?})",
                self.state
            )));
        }

        let channel = cadence.book_channel(instrument);
        self.session.subscribe(&[channel.as_str()]).await?;
        self.state = StreamState::Subscribed;
        info!(channel = %channel, "subscribed");
        Ok(channel)
    }

    /// Request a graceful shutdown; idempotent
    pub async fn close(&mut self) -> Result<(), ExchangeError> {
        if self.state != StreamState::Closed {
            self.session.close().await?;
            self.state = StreamState::Closed;
        }
        Ok(())
    }
}

impl<S: WsSession<DeribitCodec> + Send + 'static> MarketStream<S> {
    /// Start the receive loop on its own task and return the update channel.
    ///
    /// Messages are delivered in wire order. When the message carries a
    /// server timestamp the propagation delay is computed against the local
    /// receive instant and emitted as a metric. The loop stops on the first
    /// read/decode error or when the receiver is dropped; either way the
    /// session ends closed.
    pub fn into_updates(mut self) -> mpsc::Receiver<StreamUpdate> {
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(async move {
            self.state = StreamState::Receiving;

            loop {
                match self.session.next_message().await {
                    Some(Ok(event)) => {
                        let received_at = Utc::now().timestamp_millis();
                        let delay = propagation_delay_ms(&event, received_at);
                        if let Some(delay) = delay {
                            info!(delay_ms = delay, "propagation delay");
                        }

                        let update = StreamUpdate {
                            event,
                            propagation_delay_ms: delay,
                        };
                        if tx.send(update).await.is_err() {
                            // Receiver dropped, nobody is listening anymore
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("error during WebSocket read: {}", e);
                        break;
                    }
                    None => break,
                }
            }

            self.state = StreamState::Closed;
            let _ = self.session.close().await;
        });

        rx
    }
}

/// Client receive time minus the server-stamped send time, both in ms since
/// epoch. `None` when the message carries no timestamp.
pub fn propagation_delay_ms(event: &DeribitWsEvent, received_at_ms: i64) -> Option<i64> {
    match event {
        DeribitWsEvent::Notification {
            timestamp: Some(server_ms),
            ..
        } => Some(received_at_ms - server_ms),
        _ => None,
    }
}
