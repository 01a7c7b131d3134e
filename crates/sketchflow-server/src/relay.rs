//! Room membership and snapshot fan-out.
//!
//! Each connection owns an unbounded outbox; relaying a snapshot only pushes
//! onto the outboxes of the other members, so no lock is ever held across an
//! await point.

use crate::protocol::ServerMessage;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of one WebSocket connection.
pub type PeerId = Uuid;

/// Sending half of a connection's outbox.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("room `{0}` does not exist")]
    UnknownRoom(String),
    #[error("peer {peer} is not a member of room `{room}`")]
    NotAMember { peer: PeerId, room: String },
}

/// Room state
#[derive(Debug, Default)]
struct Room {
    /// Connected peer IDs
    peers: HashSet<PeerId>,
}

/// Shared relay state: rooms by name and outboxes by peer.
///
/// A room exists while it has at least one member.
#[derive(Debug, Default)]
pub struct RoomRelay {
    rooms: DashMap<String, Room>,
    peers: DashMap<PeerId, Outbox>,
}

impl RoomRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    pub fn connect(&self) -> (PeerId, mpsc::UnboundedReceiver<ServerMessage>) {
        let peer = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(peer, tx);
        (peer, rx)
    }

    /// Add `peer` to `room`, creating it if needed. Returns the member count.
    pub fn join(&self, peer: PeerId, room: &str) -> usize {
        let mut entry = self.rooms.entry(room.to_string()).or_default();
        entry.peers.insert(peer);
        entry.peers.len()
    }

    /// Remove `peer` from `room`. Returns whether it was a member.
    pub fn leave(&self, peer: PeerId, room: &str) -> bool {
        let removed = self
            .rooms
            .get_mut(room)
            .map(|mut entry| entry.peers.remove(&peer))
            .unwrap_or(false);
        self.rooms.remove_if(room, |_, entry| entry.peers.is_empty());
        removed
    }

    /// Drop a connection: leave every room and discard its outbox.
    pub fn disconnect(&self, peer: PeerId) {
        self.peers.remove(&peer);
        self.rooms.retain(|_, entry| {
            entry.peers.remove(&peer);
            !entry.peers.is_empty()
        });
    }

    /// Forward a snapshot from `sender` to every other member of `room`.
    ///
    /// Returns the number of outboxes the snapshot was delivered to.
    pub fn relay(&self, sender: PeerId, room: &str, elements: Value) -> Result<usize, RelayError> {
        let recipients: Vec<PeerId> = {
            let entry = self
                .rooms
                .get(room)
                .ok_or_else(|| RelayError::UnknownRoom(room.to_string()))?;
            if !entry.peers.contains(&sender) {
                return Err(RelayError::NotAMember {
                    peer: sender,
                    room: room.to_string(),
                });
            }
            entry.peers.iter().filter(|peer| **peer != sender).copied().collect()
        };

        let msg = ServerMessage::PullSnapshot {
            room: room.to_string(),
            elements,
        };
        let delivered = recipients
            .iter()
            .filter(|peer| {
                self.peers
                    .get(*peer)
                    .is_some_and(|outbox| outbox.send(msg.clone()).is_ok())
            })
            .count();
        Ok(delivered)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of members of `room` (0 when it does not exist).
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |entry| entry.peers.len())
    }

    pub fn is_member(&self, peer: PeerId, room: &str) -> bool {
        self.rooms.get(room).is_some_and(|entry| entry.peers.contains(&peer))
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_counts_members() {
        let relay = RoomRelay::new();
        let (a, _rx_a) = relay.connect();
        let (b, _rx_b) = relay.connect();

        assert_eq!(relay.join(a, "room1"), 1);
        assert_eq!(relay.join(b, "room1"), 2);
        // joining twice is idempotent
        assert_eq!(relay.join(b, "room1"), 2);
        assert_eq!(relay.room_count(), 1);
    }

    #[test]
    fn test_relay_skips_sender() {
        let relay = RoomRelay::new();
        let (a, mut rx_a) = relay.connect();
        let (b, mut rx_b) = relay.connect();
        relay.join(a, "room1");
        relay.join(b, "room1");

        let elements = json!([{"id": "e1", "tool": "line"}]);
        assert_eq!(relay.relay(a, "room1", elements.clone()), Ok(1));

        assert_eq!(
            rx_b.try_recv().unwrap(),
            ServerMessage::PullSnapshot {
                room: "room1".to_string(),
                elements,
            }
        );
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_rooms_are_isolated() {
        let relay = RoomRelay::new();
        let (a, _rx_a) = relay.connect();
        let (b, _rx_b) = relay.connect();
        let (c, mut rx_c) = relay.connect();
        relay.join(a, "room1");
        relay.join(b, "room1");
        relay.join(c, "room2");

        assert_eq!(relay.relay(a, "room1", json!([])), Ok(1));
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn test_empty_room_is_deleted() {
        let relay = RoomRelay::new();
        let (a, _rx_a) = relay.connect();
        let (b, _rx_b) = relay.connect();
        relay.join(a, "room1");
        relay.join(b, "room1");

        assert!(relay.leave(b, "room1"));
        assert!(!relay.leave(b, "room1"));
        assert_eq!(relay.member_count("room1"), 1);
        assert_eq!(relay.relay(a, "room1", json!([])), Ok(0));

        assert!(relay.leave(a, "room1"));
        assert_eq!(relay.room_count(), 0);
        assert_eq!(
            relay.relay(a, "room1", json!([])),
            Err(RelayError::UnknownRoom("room1".to_string()))
        );
    }

    #[test]
    fn test_non_member_cannot_push() {
        let relay = RoomRelay::new();
        let (a, _rx_a) = relay.connect();
        let (b, mut rx_b) = relay.connect();
        relay.join(b, "room1");

        assert_eq!(
            relay.relay(a, "room1", json!([])),
            Err(RelayError::NotAMember {
                peer: a,
                room: "room1".to_string()
            })
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_cleans_up_everywhere() {
        let relay = RoomRelay::new();
        let (a, _rx_a) = relay.connect();
        let (b, rx_b) = relay.connect();
        relay.join(a, "room1");
        relay.join(b, "room1");
        relay.join(b, "room2");

        drop(rx_b);
        relay.disconnect(b);

        assert_eq!(relay.peer_count(), 1);
        assert_eq!(relay.room_count(), 1);
        assert!(!relay.is_member(b, "room1"));
        assert_eq!(relay.relay(a, "room1", json!([])), Ok(0));
    }

    #[test]
    fn test_closed_outbox_is_not_counted() {
        let relay = RoomRelay::new();
        let (a, _rx_a) = relay.connect();
        let (b, rx_b) = relay.connect();
        relay.join(a, "room1");
        relay.join(b, "room1");

        drop(rx_b);
        assert_eq!(relay.relay(a, "room1", json!([])), Ok(0));
    }
}
