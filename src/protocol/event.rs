//! Calendar event payloads relayed from the gateway to the hub.

use serde::{Deserialize, Serialize};

/// An activity published to, updated on, or deleted from the hub.
///
/// Fields the bridge does not know about are preserved in `extra` so the
/// payload reaches the hub untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub course_id: String,
    pub teacher_ids: Vec<String>,
    pub participant_ids: Vec<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body accepted by the gateway's event endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventRequest {
    pub activity: Event,
}
