//! WebSocket hub transport.
//!
//! Every stream and every unary call is its own WebSocket to the hub. Frames
//! are JSON-encoded [`Message`]s in text frames (binary frames are accepted
//! on receive).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, client::IntoClientRequest};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};

use crate::protocol::Message;
use crate::transport::{tls, HubConnector, HubStream, TransportError, UnaryCall};

/// Endpoint serving the long-lived request stream.
pub const STREAM_ENDPOINT: &str = "process";

/// Prefix of unary call endpoints (`rpc/{method}`).
pub const CALL_PREFIX: &str = "rpc";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector speaking to the hub over (optionally TLS-protected) WebSockets.
pub struct WsConnector {
    base_url: String,
    tls: Option<Arc<rustls::ClientConfig>>,
    closed: watch::Sender<bool>,
}

impl WsConnector {
    /// Create a connector for `address` (`host:port`).
    ///
    /// With a certificate file the connector uses `wss://` and trusts only
    /// the CA certificates in that file. Unusable certificate material is an
    /// error; callers treat it as fatal.
    pub fn new(address: &str, cert_file: Option<&Path>) -> Result<Self, TransportError> {
        let (scheme, tls) = match cert_file {
            Some(path) => {
                let config = tls::load_client_config(path)?;
                tracing::info!(cert_file = ?path, "TLS certificate registered");
                ("wss", Some(config))
            }
            None => {
                tracing::info!("Running without TLS (insecure)");
                ("ws", None)
            }
        };

        let base_url = format!("{}://{}", scheme, address.trim_end_matches('/'));
        url::Url::parse(&base_url).map_err(|e| {
            TransportError::Connect(format!("invalid hub address '{}': {}", address, e))
        })?;

        let (closed, _) = watch::channel(false);
        Ok(Self {
            base_url,
            tls,
            closed,
        })
    }

    /// Base URL streams and calls are opened against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn connect(&self, endpoint: &str) -> Result<WsStream, TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(format!("invalid url '{}': {}", url, e)))?;
        let connector = self.tls.clone().map(Connector::Rustls);

        let mut closed = self.closed.subscribe();
        tokio::select! {
            result = tokio_tungstenite::connect_async_tls_with_config(
                request, None, false, connector,
            ) => {
                let (ws, _response) = result.map_err(|e| TransportError::Connect(e.to_string()))?;
                Ok(ws)
            }
            _ = wait_closed(&mut closed) => Err(TransportError::Closed),
        }
    }
}

#[async_trait]
impl HubConnector for WsConnector {
    async fn open_stream(&self) -> Result<Box<dyn HubStream>, TransportError> {
        let ws = self.connect(STREAM_ENDPOINT).await?;
        Ok(Box::new(WsHubStream::new(ws, self.closed.subscribe())))
    }

    async fn call(&self, call: UnaryCall) -> Result<Message, TransportError> {
        let payload = call.payload()?;
        let endpoint = format!("{}/{}", CALL_PREFIX, call.method());

        let mut ws = self.connect(&endpoint).await?;
        ws.send(tungstenite::Message::text(payload))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let mut stream = WsHubStream::new(ws, self.closed.subscribe());
        let reply = stream.recv().await?.ok_or(TransportError::NoReply)?;
        if let Err(e) = stream.close_send().await {
            tracing::debug!(method = call.method(), error = %e, "Close after unary call failed");
        }
        Ok(reply)
    }

    async fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// One stream over a WebSocket.
pub struct WsHubStream {
    ws: WsStream,
    closed: watch::Receiver<bool>,
}

impl WsHubStream {
    fn new(ws: WsStream, closed: watch::Receiver<bool>) -> Self {
        Self { ws, closed }
    }
}

#[async_trait]
impl HubStream for WsHubStream {
    async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }

        loop {
            let frame = tokio::select! {
                frame = self.ws.next() => frame,
                _ = wait_closed(&mut self.closed) => return Err(TransportError::Closed),
            };

            match frame {
                None => return Ok(None),
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Ok(Some(serde_json::from_str(text.as_str())?));
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    return Ok(Some(serde_json::from_slice(&data)?));
                }
                Some(Ok(tungstenite::Message::Close(_))) => return Ok(None),
                // ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let json = serde_json::to_string(message)?;
        self.ws
            .send(tungstenite::Message::text(json))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        match self.ws.close(None).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}
