//! Shared utilities for integration tests: mock backends and a mock hub.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use hub_bridge::protocol::Message;

/// How long helpers wait before failing a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Requests a mock backend received, in arrival order.
pub type RequestLog = Arc<Mutex<Vec<RecordedRequest>>>;

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, RequestLog)
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let requests = Arc::clone(&log);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        requests.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

/// Start a mock backend that returns a fixed response.
pub async fn start_mock_backend(status: u16, body: &'static str) -> (SocketAddr, RequestLog) {
    start_programmable_backend(move |_req| async move { (status, body.to_string()) }).await
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(head_end + content_length);
    let body = String::from_utf8_lossy(&buf[head_end..body_end]).to_string();

    Some(RecordedRequest { method, path, body })
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Poll `check` until it holds or [`TEST_TIMEOUT`] passes.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// One WebSocket accepted by the mock hub.
pub struct HubConnection {
    pub path: String,
    ws: WebSocketStream<TcpStream>,
}

impl HubConnection {
    pub async fn send(&mut self, message: &Message) {
        let json = serde_json::to_string(message).unwrap();
        self.ws.send(WsMessage::text(json)).await.unwrap();
    }

    /// Next text frame as raw JSON; `None` on close.
    pub async fn next_json(&mut self) -> Option<serde_json::Value> {
        loop {
            let frame = tokio::time::timeout(TEST_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a client frame");
            match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    return Some(serde_json::from_str(text.as_str()).unwrap())
                }
                Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Next message frame; `None` on close.
    pub async fn next_message(&mut self) -> Option<Message> {
        let json = self.next_json().await?;
        Some(serde_json::from_value(json).unwrap())
    }

    /// End the hub's side of the stream.
    pub async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// A WebSocket hub on an ephemeral port.
///
/// Stream connections (`/process`) and unary calls (`/rpc/...`) are queued
/// separately.
pub struct MockHub {
    pub addr: SocketAddr,
    streams: mpsc::UnboundedReceiver<HubConnection>,
    calls: mpsc::UnboundedReceiver<HubConnection>,
}

impl MockHub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (streams_tx, streams) = mpsc::unbounded_channel();
        let (calls_tx, calls) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let streams_tx = streams_tx.clone();
                let calls_tx = calls_tx.clone();
                tokio::spawn(async move {
                    let mut path = String::new();
                    let callback = |req: &Request, resp: Response| {
                        path = req.uri().path().to_string();
                        Ok::<Response, ErrorResponse>(resp)
                    };
                    let Ok(ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await
                    else {
                        return;
                    };

                    let connection = HubConnection { path, ws };
                    if connection.path.starts_with("/rpc/") {
                        let _ = calls_tx.send(connection);
                    } else {
                        let _ = streams_tx.send(connection);
                    }
                });
            }
        });

        Self {
            addr,
            streams,
            calls,
        }
    }

    /// Hub address in `host:port` form.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub async fn accept_stream(&mut self) -> HubConnection {
        tokio::time::timeout(TEST_TIMEOUT, self.streams.recv())
            .await
            .expect("timed out waiting for a stream")
            .expect("hub listener stopped")
    }

    pub async fn accept_call(&mut self) -> HubConnection {
        tokio::time::timeout(TEST_TIMEOUT, self.calls.recv())
            .await
            .expect("timed out waiting for a call")
            .expect("hub listener stopped")
    }
}
