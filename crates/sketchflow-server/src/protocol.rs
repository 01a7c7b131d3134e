//! Wire protocol between clients and the relay.
//!
//! Messages are JSON text frames with a `type` tag:
//! ```json
//! { "type": "join", "room": "room-id" }
//! { "type": "leave", "room": "room-id" }
//! { "type": "push_snapshot", "room": "room-id", "elements": [ ... ] }
//! ```
//! The relay never looks inside `elements`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room
    Join { room: String },
    /// Leave a room
    Leave { room: String },
    /// Broadcast a snapshot to the other members of a room
    PushSnapshot { room: String, elements: Value },
}

/// A message sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join
    Joined { room: String, peer_count: usize },
    /// Snapshot pushed by another member of the room
    PullSnapshot { room: String, elements: Value },
    /// Error message
    Error { message: String },
}
