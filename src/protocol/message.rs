//! The message envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unit of exchange on the hub stream, in both directions.
///
/// A request carries the routing `path` and an opaque `body`. A response
/// carries the same `msg_id` as the request it answers plus an HTTP-style
/// `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Correlation token, round-tripped verbatim.
    #[serde(rename = "msgID")]
    pub msg_id: String,

    /// Handler selector on requests; informational on responses.
    pub path: String,

    pub headers: HashMap<String, String>,

    #[serde(with = "base64_body")]
    pub body: Vec<u8>,

    /// HTTP-style status code (responses only).
    pub status: i32,
}

impl Message {
    /// Build a request for `path`.
    pub fn request(
        msg_id: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            msg_id: msg_id.into(),
            path: path.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Build a bare response carrying only correlation, status and body.
    pub fn reply(msg_id: impl Into<String>, status: i32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            msg_id: msg_id.into(),
            status,
            body: body.into(),
            ..Default::default()
        }
    }

    /// Attach a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Lossy UTF-8 view of the body, for logs.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(s) => STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
