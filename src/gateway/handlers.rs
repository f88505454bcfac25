//! Gateway request handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::protocol::{EventRequest, Message};
use crate::session::SessionManager;

/// State injected into handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub session: Arc<SessionManager>,
    pub request_timeout: Duration,
}

/// Body of `POST /generic`. The body is text, not base64.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenericRequest {
    #[serde(rename = "msgID")]
    pub msg_id: Option<String>,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// `GET /ping`: round-trip a `ping` message through the hub.
pub async fn ping(State(state): State<GatewayState>) -> Response {
    let message = Message::request(Uuid::new_v4().to_string(), "ping", "");
    match state
        .session
        .send_generic(message, state.request_timeout)
        .await
    {
        Ok(reply) => (StatusCode::OK, reply.body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// `GET /alive`: the session's connection health.
pub async fn alive(State(state): State<GatewayState>) -> Response {
    if state.session.is_connected() {
        (StatusCode::OK, "connected to RPC server").into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "not connected to RPC server").into_response()
    }
}

/// `GET /health`: process liveness.
pub async fn health() -> &'static str {
    "OK"
}

/// `POST /generic`: relay an arbitrary message and mirror the hub's reply.
pub async fn generic(State(state): State<GatewayState>, body: Bytes) -> Response {
    let request: GenericRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    };
    if request.path.is_empty() {
        return (StatusCode::BAD_REQUEST, "no path provided in request body").into_response();
    }

    let msg_id = request
        .msg_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let message = Message {
        msg_id,
        path: request.path,
        headers: request.headers,
        body: request.body.into_bytes(),
        status: 0,
    };
    tracing::debug!(msg_id = %message.msg_id, path = %message.path, "Relaying generic request");

    match state
        .session
        .send_generic(message, state.request_timeout)
        .await
    {
        Ok(reply) => relay(reply),
        Err(e) => {
            tracing::error!(error = %e, "Error on generic rpc call");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error on generic rpc call: {}", e),
            )
                .into_response()
        }
    }
}

/// `POST /events`: publish a new event.
pub async fn post_event(State(state): State<GatewayState>, body: Bytes) -> Response {
    let request: EventRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    };
    tracing::debug!(event_id = %request.activity.event_id, "Post event");

    match state
        .session
        .post_event(request.activity, state.request_timeout)
        .await
    {
        Ok(reply) => (StatusCode::OK, reply.body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to post event");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// `PUT /events`: update an existing event.
pub async fn put_event(State(state): State<GatewayState>, body: Bytes) -> Response {
    let request: EventRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    };
    tracing::debug!(event_id = %request.activity.event_id, "Put event");

    match state
        .session
        .put_event(request.activity, state.request_timeout)
        .await
    {
        Ok(reply) => (StatusCode::OK, reply.body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to update event: {}", e),
            )
                .into_response()
        }
    }
}

/// `DELETE /events/{id}`: delete an event, mirroring the hub's status.
pub async fn delete_event(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    tracing::debug!(event_id = %id, "Delete event");

    match state
        .session
        .delete_event(&id, state.request_timeout)
        .await
    {
        Ok(reply) => (reply_status(reply.status), reply.body).into_response(),
        Err(e) => {
            tracing::error!(event_id = %id, error = %e, "Failed to delete event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to delete event: {}", e),
            )
                .into_response()
        }
    }
}

/// Map a hub status onto HTTP. Statuses HTTP cannot carry become 502.
fn reply_status(status: i32) -> StatusCode {
    u16::try_from(status)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or_else(|| {
            tracing::warn!(status, "Hub replied with a status HTTP cannot carry");
            StatusCode::BAD_GATEWAY
        })
}

/// Mirror a hub reply: status, headers and body.
fn relay(reply: Message) -> Response {
    let mut response = (reply_status(reply.status), reply.body).into_response();
    for (name, value) in &reply.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::debug!(header = %name, "Skipping header HTTP cannot carry"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dispatch::{Dispatcher, HandlerRegistry};
    use crate::session::HubSettings;
    use crate::transport::{MemoryConnector, MemoryHub, TransportError, UnaryCall};

    fn state() -> (GatewayState, MemoryHub) {
        let (connector, hub) = MemoryConnector::pair();
        let session = SessionManager::new(
            HubSettings {
                address: "memory".into(),
                cert_file: None,
                connect_timeout: Duration::from_secs(1),
                poll_frequency: Duration::ZERO,
                connect_fail_sleep: Duration::from_secs(1),
            },
            Arc::new(connector),
            Dispatcher::new(HandlerRegistry::new()),
        );
        let state = GatewayState {
            session: Arc::new(session),
            request_timeout: Duration::from_secs(2),
        };
        (state, hub)
    }

    /// Answer the next unary call with `reply`, handing the call back.
    fn answer_once(
        mut hub: MemoryHub,
        reply: Result<Message, TransportError>,
    ) -> tokio::task::JoinHandle<UnaryCall> {
        tokio::spawn(async move {
            let pending = hub.next_call().await.unwrap();
            let call = pending.call.clone();
            pending.respond(reply);
            call
        })
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn ping_returns_hub_body() {
        let (state, hub) = state();
        let call = answer_once(hub, Ok(Message::reply("", 200, "pong")));

        let response = ping(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "pong");

        match call.await.unwrap() {
            UnaryCall::Generic(message) => assert_eq!(message.path, "ping"),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn alive_reports_disconnected_session() {
        let (state, _hub) = state();
        let response = alive(State(state)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "not connected to RPC server");
    }

    #[tokio::test]
    async fn generic_rejects_malformed_and_pathless_bodies() {
        let (state, _hub) = state();

        let response = generic(State(state.clone()), Bytes::from_static(b"{not json")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = generic(State(state), Bytes::from_static(br#"{"body":"x"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "no path provided in request body");
    }

    #[tokio::test]
    async fn generic_mirrors_hub_reply_and_fills_msg_id() {
        let (state, hub) = state();
        let reply = Message::reply("", 201, "created").with_header("x-hub", "yes");
        let call = answer_once(hub, Ok(reply));

        let response = generic(
            State(state),
            Bytes::from_static(br#"{"path":"absence/list","body":"{\"a\":1}"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-hub"], "yes");
        assert_eq!(body_text(response).await, "created");

        match call.await.unwrap() {
            UnaryCall::Generic(message) => {
                assert_eq!(message.path, "absence/list");
                assert_eq!(message.body, br#"{"a":1}"#.to_vec());
                assert!(Uuid::parse_str(&message.msg_id).is_ok());
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn generic_reports_rpc_errors() {
        let (state, hub) = state();
        let _call = answer_once(hub, Err(TransportError::Receive("boom".into())));

        let response = generic(
            State(state),
            Bytes::from_static(br#"{"msgID":"m1","path":"ping"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            "Error on generic rpc call: receive failed: boom"
        );
    }

    #[tokio::test]
    async fn events_are_relayed() {
        let (state, hub) = state();
        let call = answer_once(hub, Ok(Message::reply("", 200, "stored")));

        let response = post_event(
            State(state),
            Bytes::from_static(br#"{"activity":{"eventId":"e1","name":"Math"}}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "stored");

        match call.await.unwrap() {
            UnaryCall::PublishEvent(event) => {
                assert_eq!(event.event_id, "e1");
                assert_eq!(event.name, "Math");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_event_is_unprocessable() {
        let (state, _hub) = state();
        let response = put_event(State(state), Bytes::from_static(br#""just text""#)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn delete_mirrors_hub_status() {
        let (state, hub) = state();
        let call = answer_once(hub, Ok(Message::reply("", 404, "no such event")));

        let response = delete_event(State(state), Path("e7".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "no such event");
        assert_eq!(call.await.unwrap(), UnaryCall::DeleteEvent("e7".into()));
    }

    #[tokio::test]
    async fn calls_fail_once_session_is_draining() {
        let (state, _hub) = state();
        state.session.drain().await;

        let response = put_event(
            State(state),
            Bytes::from_static(br#"{"activity":{"eventId":"e1"}}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            "Failed to update event: session is shutting down"
        );
    }

    #[test]
    fn unrepresentable_statuses_become_bad_gateway() {
        assert_eq!(reply_status(0), StatusCode::BAD_GATEWAY);
        assert_eq!(reply_status(-1), StatusCode::BAD_GATEWAY);
        assert_eq!(reply_status(204), StatusCode::NO_CONTENT);
    }
}
