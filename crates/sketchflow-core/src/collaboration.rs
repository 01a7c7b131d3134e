//! Room binding for live sessions.
//!
//! A [`SyncClient`] speaks the wire protocol for one room. It never touches
//! the network itself: outgoing frames are queued as JSON strings and drained
//! by whoever owns the [`Transport`](crate::sync::Transport).

use crate::element::Snapshot;
use crate::sync::{ClientMessage, SyncEvent, parse_server_message};

/// Protocol endpoint bound to a single room.
#[derive(Debug)]
pub struct SyncClient {
    /// Room this client is bound to.
    room: String,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl SyncClient {
    /// Bind to `room`. Queues the join message.
    pub fn new(room: impl Into<String>) -> Self {
        let mut client = Self {
            room: room.into(),
            outgoing: Vec::new(),
        };
        client.rejoin();
        client
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Queue a snapshot broadcast to the other members of the room.
    pub fn publish(&mut self, snapshot: &Snapshot) {
        self.queue(&ClientMessage::PushSnapshot {
            room: self.room.clone(),
            elements: snapshot.clone(),
        });
    }

    /// Queue the join message again, e.g. after the transport reconnected.
    /// Snapshots pushed while offline are not replayed.
    pub fn rejoin(&mut self) {
        self.queue(&ClientMessage::Join {
            room: self.room.clone(),
        });
    }

    /// Unbind from the room. Returns every message still queued, ending with
    /// the leave message.
    pub fn leave(mut self) -> Vec<String> {
        self.queue(&ClientMessage::Leave {
            room: self.room.clone(),
        });
        self.outgoing
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    /// Check if there are pending outgoing messages.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Whether an event from the transport concerns this client's room.
    pub fn accepts(&self, event: &SyncEvent) -> bool {
        match event {
            SyncEvent::JoinedRoom { room, .. } | SyncEvent::SnapshotReceived { room, .. } => {
                *room == self.room
            }
            _ => true,
        }
    }

    /// Handle an incoming server message.
    ///
    /// Malformed frames and messages for other rooms yield `None`.
    pub fn handle_message(&self, json: &str) -> Option<SyncEvent> {
        match parse_server_message(json) {
            Ok(event) if self.accepts(&event) => Some(event),
            Ok(event) => {
                log::debug!("Ignoring event for another room: {:?}", event);
                None
            }
            Err(e) => {
                log::warn!("Failed to parse server message: {}", e);
                None
            }
        }
    }

    fn queue(&mut self, msg: &ClientMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::error!("Failed to encode {:?}: {}", msg, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Style, Tool};
    use kurbo::Point;

    fn decode(json: &str) -> ClientMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_new_queues_join() {
        let mut client = SyncClient::new("room1");
        assert!(client.has_outgoing());
        let outgoing = client.take_outgoing();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(
            decode(&outgoing[0]),
            ClientMessage::Join {
                room: "room1".to_string()
            }
        );
        assert!(!client.has_outgoing());
    }

    #[test]
    fn test_publish_and_leave() {
        let mut client = SyncClient::new("room1");
        client.take_outgoing();

        let rect = Element::new(Tool::Rectangle, Point::ZERO, Point::new(5.0, 5.0), Style::default());
        let snapshot = Snapshot::new(vec![rect]);
        client.publish(&snapshot);

        let remaining = client.leave();
        assert_eq!(remaining.len(), 2);
        assert_eq!(
            decode(&remaining[0]),
            ClientMessage::PushSnapshot {
                room: "room1".to_string(),
                elements: snapshot,
            }
        );
        assert_eq!(
            decode(&remaining[1]),
            ClientMessage::Leave {
                room: "room1".to_string()
            }
        );
    }

    #[test]
    fn test_handle_message_filters_rooms() {
        let client = SyncClient::new("room1");
        let ours = client.handle_message(r#"{"type":"pull_snapshot","room":"room1","elements":[]}"#);
        assert!(matches!(ours, Some(SyncEvent::SnapshotReceived { .. })));

        let theirs = client.handle_message(r#"{"type":"pull_snapshot","room":"room2","elements":[]}"#);
        assert!(theirs.is_none());

        let error = client.handle_message(r#"{"type":"error","message":"bad frame"}"#);
        assert_eq!(
            error,
            Some(SyncEvent::Error {
                message: "bad frame".to_string()
            })
        );

        assert!(client.handle_message("not json").is_none());
    }
}
