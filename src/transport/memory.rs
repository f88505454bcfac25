//! In-process hub transport.
//!
//! [`MemoryConnector`] is the client half handed to a session;
//! [`MemoryHub`] is the hub half. The hub accepts streams as
//! [`HubSide`] handles, pushes requests, reads the client's frames
//! (including the half-close marker) and answers unary calls.
//! Every open attempt is timestamped with `tokio::time::Instant`, so paused
//! runtime clocks give exact intervals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::protocol::Message;
use crate::transport::{HubConnector, HubStream, TransportError, UnaryCall};

/// A frame written by the client side of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Message(Message),
    /// The client half-closed its send side.
    CloseSend,
}

struct Shared {
    available: AtomicBool,
    stalled: AtomicBool,
    closed: watch::Sender<bool>,
    attempts: Mutex<Vec<Instant>>,
    streams: mpsc::UnboundedSender<HubSide>,
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl Shared {
    fn record_attempt(&self) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.push(Instant::now());
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Client half of the in-process transport.
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

/// Hub half of the in-process transport.
pub struct MemoryHub {
    shared: Arc<Shared>,
    streams: mpsc::UnboundedReceiver<HubSide>,
    calls: mpsc::UnboundedReceiver<PendingCall>,
}

impl MemoryConnector {
    /// Create a connected client/hub pair. The hub starts available.
    pub fn pair() -> (MemoryConnector, MemoryHub) {
        let (streams_tx, streams_rx) = mpsc::unbounded_channel();
        let (calls_tx, calls_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            available: AtomicBool::new(true),
            stalled: AtomicBool::new(false),
            closed,
            attempts: Mutex::new(Vec::new()),
            streams: streams_tx,
            calls: calls_tx,
        });

        (
            MemoryConnector {
                shared: Arc::clone(&shared),
            },
            MemoryHub {
                shared,
                streams: streams_rx,
                calls: calls_rx,
            },
        )
    }
}

#[async_trait]
impl HubConnector for MemoryConnector {
    async fn open_stream(&self) -> Result<Box<dyn HubStream>, TransportError> {
        self.shared.record_attempt();

        if self.shared.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.shared.stalled.load(Ordering::SeqCst) {
            let mut closed = self.shared.closed.subscribe();
            wait_closed(&mut closed).await;
            return Err(TransportError::Closed);
        }
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("hub unavailable".into()));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();

        self.shared
            .streams
            .send(HubSide {
                to_client: Some(to_client),
                from_client,
            })
            .map_err(|_| TransportError::Connect("hub is gone".into()))?;

        Ok(Box::new(MemoryStream {
            inbound,
            outbound,
            closed: self.shared.closed.subscribe(),
            send_closed: false,
        }))
    }

    async fn call(&self, call: UnaryCall) -> Result<Message, TransportError> {
        if self.shared.is_closed() {
            return Err(TransportError::Closed);
        }

        let (reply, rx) = oneshot::channel();
        self.shared
            .calls
            .send(PendingCall { call, reply })
            .map_err(|_| TransportError::Connect("hub is gone".into()))?;

        let mut closed = self.shared.closed.subscribe();
        tokio::select! {
            result = rx => result.unwrap_or(Err(TransportError::NoReply)),
            _ = wait_closed(&mut closed) => Err(TransportError::Closed),
        }
    }

    async fn close(&self) {
        self.shared.closed.send_replace(true);
    }
}

impl MemoryHub {
    /// Wait for the client to open the next stream.
    pub async fn accept(&mut self) -> Option<HubSide> {
        self.streams.recv().await
    }

    /// Wait for the next unary call.
    pub async fn next_call(&mut self) -> Option<PendingCall> {
        self.calls.recv().await
    }

    /// When unavailable, stream opens fail with a connect error.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// When stalled, stream opens hang until the connection is closed.
    pub fn set_stalled(&self, stalled: bool) {
        self.shared.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Instants of every stream open attempt so far.
    pub fn attempts(&self) -> Vec<Instant> {
        self.shared
            .attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether the client closed the connection.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

/// Hub-side handle of one accepted stream.
pub struct HubSide {
    to_client: Option<mpsc::UnboundedSender<Result<Message, TransportError>>>,
    from_client: mpsc::UnboundedReceiver<ClientFrame>,
}

impl HubSide {
    /// Push a request to the client. Returns false once the stream is finished.
    pub fn send(&self, message: Message) -> bool {
        self.push(Ok(message))
    }

    /// Make the client's next `recv` fail with `error`.
    pub fn fail(&self, error: TransportError) -> bool {
        self.push(Err(error))
    }

    /// Close the hub's send side; the client sees end-of-stream.
    pub fn finish(&mut self) {
        self.to_client = None;
    }

    /// Stop accepting client frames; later client sends fail.
    pub fn refuse_frames(&mut self) {
        self.from_client.close();
    }

    /// Next frame written by the client, `None` once the client dropped the stream.
    pub async fn next_frame(&mut self) -> Option<ClientFrame> {
        self.from_client.recv().await
    }

    /// Next message written by the client; a half-close or a dropped stream yields `None`.
    pub async fn next_message(&mut self) -> Option<Message> {
        match self.next_frame().await {
            Some(ClientFrame::Message(message)) => Some(message),
            _ => None,
        }
    }

    fn push(&self, item: Result<Message, TransportError>) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(item).is_ok(),
            None => false,
        }
    }
}

/// A unary call waiting for the hub's answer.
pub struct PendingCall {
    pub call: UnaryCall,
    reply: oneshot::Sender<Result<Message, TransportError>>,
}

impl PendingCall {
    pub fn respond(self, result: Result<Message, TransportError>) {
        let _ = self.reply.send(result);
    }
}

struct MemoryStream {
    inbound: mpsc::UnboundedReceiver<Result<Message, TransportError>>,
    outbound: mpsc::UnboundedSender<ClientFrame>,
    closed: watch::Receiver<bool>,
    send_closed: bool,
}

#[async_trait]
impl HubStream for MemoryStream {
    async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }

        tokio::select! {
            item = self.inbound.recv() => match item {
                None => Ok(None),
                Some(Ok(message)) => Ok(Some(message)),
                Some(Err(e)) => Err(e),
            },
            _ = wait_closed(&mut self.closed) => Err(TransportError::Closed),
        }
    }

    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        if self.send_closed {
            return Err(TransportError::Send("send side already closed".into()));
        }
        self.outbound
            .send(ClientFrame::Message(message.clone()))
            .map_err(|_| TransportError::Send("hub dropped the stream".into()))
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        if !self.send_closed {
            self.send_closed = true;
            let _ = self.outbound.send(ClientFrame::CloseSend);
        }
        Ok(())
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_round_trip_and_half_close() {
        let (connector, mut hub) = MemoryConnector::pair();

        let mut stream = connector.open_stream().await.unwrap();
        let mut side = hub.accept().await.unwrap();

        assert!(side.send(Message::request("m1", "ping", "")));
        let received = stream.recv().await.unwrap().unwrap();
        assert_eq!(received.msg_id, "m1");

        stream.send(&Message::reply("m1", 200, "pong")).await.unwrap();
        assert_eq!(side.next_message().await.unwrap().body_text(), "pong");

        side.finish();
        assert_eq!(stream.recv().await.unwrap(), None);

        stream.close_send().await.unwrap();
        assert_eq!(side.next_frame().await, Some(ClientFrame::CloseSend));
    }

    #[tokio::test]
    async fn close_unblocks_pending_recv() {
        let (connector, mut hub) = MemoryConnector::pair();
        let connector = Arc::new(connector);

        let mut stream = connector.open_stream().await.unwrap();
        let _side = hub.accept().await.unwrap();

        let closer = Arc::clone(&connector);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            closer.close().await;
        });

        assert_eq!(stream.recv().await.unwrap_err(), TransportError::Closed);
        assert!(hub.is_closed());
        assert!(matches!(connector.open_stream().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn unavailable_hub_fails_opens_and_records_attempts() {
        let (connector, hub) = MemoryConnector::pair();
        hub.set_available(false);

        assert!(matches!(
            connector.open_stream().await,
            Err(TransportError::Connect(_))
        ));
        assert!(matches!(
            connector.open_stream().await,
            Err(TransportError::Connect(_))
        ));
        assert_eq!(hub.attempts().len(), 2);
    }

    #[tokio::test]
    async fn unary_call_is_answered_by_hub() {
        let (connector, mut hub) = MemoryConnector::pair();

        tokio::spawn(async move {
            let pending = hub.next_call().await.unwrap();
            assert_eq!(pending.call.method(), "generic");
            pending.respond(Ok(Message::reply("m1", 200, "ok")));
        });

        let reply = connector
            .call(UnaryCall::Generic(Message::request("m1", "ping", "")))
            .await
            .unwrap();
        assert_eq!(reply.status, 200);
    }
}
