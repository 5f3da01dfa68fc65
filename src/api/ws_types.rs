use serde::Serialize;

use crate::models::WhaleEvent;

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "whale_alert")]
    WhaleAlert(WhaleEvent),

    /// Top rows by occurrence count after a refresh.
    #[serde(rename = "snapshot")]
    Snapshot(Vec<WhaleEvent>),
}
