use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use super::messages::{InboundMessage, OutboundMessage};
use crate::error::ChannelError;

/// Depth of the outbound send queue. A full queue means the transport is
/// not keeping up; callers drop rather than wait.
const SEND_QUEUE_DEPTH: usize = 64;
const RECV_QUEUE_DEPTH: usize = 64;

/// A connected bidirectional message channel.
///
/// `open` flips to `false` exactly once, when the transport closes (locally
/// or remotely); awaiting that transition is how the session observes
/// remote closure without polling.
pub struct ChannelHandle {
    pub outbound: mpsc::Sender<OutboundMessage>,
    pub inbound: mpsc::Receiver<InboundMessage>,
    pub open: watch::Receiver<bool>,
}

impl ChannelHandle {
    /// Build a handle from raw channel halves. Used by in-process channel
    /// implementations and test doubles.
    pub fn from_parts(
        outbound: mpsc::Sender<OutboundMessage>,
        inbound: mpsc::Receiver<InboundMessage>,
        open: watch::Receiver<bool>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            open,
        }
    }
}

/// Opens a message channel to the transcription service.
///
/// The connect future resolving is the "channel opened and ready" event;
/// the session races it against its connect timeout.
#[async_trait::async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, bearer_token: &str) -> Result<ChannelHandle, ChannelError>;
}

/// WebSocket channel speaking JSON text frames.
///
/// The credential travels in the subprotocol list, the way the service's
/// handshake expects it.
pub struct WebSocketConnector {
    endpoint: String,
}

impl WebSocketConnector {
    /// `endpoint` is the full wss:// URL including any API version query.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn connect(&self, bearer_token: &str) -> Result<ChannelHandle, ChannelError> {
        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;

        let protocols = format!("transcribe-protocol, jwt-{bearer_token}");
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_str(&protocols)
                .map_err(|e| ChannelError::Handshake(e.to_string()))?,
        );

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;

        info!("WebSocket channel open: {}", self.endpoint);

        let (mut write, mut read) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundMessage>(SEND_QUEUE_DEPTH);
        let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(RECV_QUEUE_DEPTH);
        let (open_tx, open_rx) = watch::channel(true);
        let open_tx = Arc::new(open_tx);

        // Writer task: serialize and send until the session drops its
        // sender, then close the socket.
        let writer_open = Arc::clone(&open_tx);
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize outbound message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    warn!("WebSocket send failed: {}", e);
                    break;
                }
            }
            let _ = write.send(Message::Close(None)).await;
            let _ = writer_open.send(false);
        });

        // Reader task: parse inbound frames until the socket closes.
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<InboundMessage>(&text) {
                            Ok(message) => {
                                if inbound_tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Failed to parse inbound message: {}", e),
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!("WebSocket closed by remote: {:?}", frame);
                        break;
                    }
                    Ok(_) => {} // ping/pong/binary: nothing to do
                    Err(e) => {
                        warn!("WebSocket receive failed: {}", e);
                        break;
                    }
                }
            }
            let _ = open_tx.send(false);
        });

        Ok(ChannelHandle::from_parts(outbound_tx, inbound_rx, open_rx))
    }
}
