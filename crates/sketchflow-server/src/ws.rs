//! WebSocket connection handling.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::relay::{PeerId, RoomRelay};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<Arc<RoomRelay>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

/// Drive one connection until the client goes away.
async fn handle_socket(socket: WebSocket, relay: Arc<RoomRelay>) {
    let (peer, mut outbox) = relay.connect();
    info!("New connection: {}", peer);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_text(&relay, peer, &text) {
                            if send(&mut sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame from {}", peer);
                    }
                    Some(Ok(_)) => {} // ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer, e);
                        break;
                    }
                }
            }

            Some(msg) = outbox.recv() => {
                if send(&mut sender, &msg).await.is_err() {
                    break;
                }
            }
        }
    }

    relay.disconnect(peer);
    info!("Connection closed: {}", peer);
}

/// Apply one text frame to the relay and return the direct reply, if any.
pub(crate) fn handle_text(relay: &RoomRelay, peer: PeerId, text: &str) -> Option<ServerMessage> {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Invalid message from {}: {}", peer, e);
            return Some(ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            });
        }
    };

    match msg {
        ClientMessage::Join { room } => {
            let peer_count = relay.join(peer, &room);
            info!("Peer {} joined room {} ({} members)", peer, room, peer_count);
            Some(ServerMessage::Joined { room, peer_count })
        }
        ClientMessage::Leave { room } => {
            if relay.leave(peer, &room) {
                info!("Peer {} left room {}", peer, room);
            }
            None
        }
        ClientMessage::PushSnapshot { room, elements } => {
            match relay.relay(peer, &room, elements) {
                Ok(delivered) => debug!("Relayed snapshot in {} to {} peers", room, delivered),
                Err(e) => warn!("Dropped snapshot from {}: {}", peer, e),
            }
            None
        }
    }
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to encode {:?}: {}", msg, e);
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}
