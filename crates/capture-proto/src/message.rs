use serde::{Deserialize, Serialize};

use crate::options::{StreamOptions, StreamOptionsPatch};
use crate::ImageFormat;

/// A single dispatched frame, matching the `frame` row of spec.md §6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMessage {
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data_url: String,
    pub size: usize,
    /// Milliseconds since Unix epoch.
    pub timestamp: u64,
}

/// Snapshot reply to `get_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub window_id: u64,
    pub active: bool,
    pub fps: u32,
    pub frame_count: u64,
    pub bytes_sent: u64,
    pub duration_ms: u64,
    pub options: StreamOptions,
}

/// Everything the session manager can send over the streaming channel
/// (spec.md §6). `#[serde(tag = "type")]` makes the wire shape match the
/// table exactly: each variant serializes as `{"type": "...", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "session_started")]
    SessionStarted { session_id: String, options: StreamOptions },
    #[serde(rename = "frame")]
    Frame(FrameMessage),
    #[serde(rename = "session_updated")]
    SessionUpdated { options: StreamOptions },
    #[serde(rename = "status")]
    Status(SessionStatus),
    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

/// Everything a client can send back on the control channel (spec.md §4.6.2, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum ClientCommand {
    #[serde(rename = "update_options")]
    UpdateOptions(StreamOptionsPatch),
    #[serde(rename = "get_status")]
    GetStatus,
    #[serde(rename = "stop")]
    Stop,
}
