//! WebSocket handler — the per-session event loop.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection id and enters a `select!` loop:
//! - Incoming client events → parse + dispatch against the room registry
//! - Relayed events from room peers → forward to this client
//!
//! `process_event` is pure protocol logic: it mutates registry state through
//! the room service, triggers peer broadcasts, and returns the events owed
//! to the sender (only `join-room` earns one — the `server-state` snapshot).
//! Transport concerns stay in the loop, so tests exercise dispatch with
//! plain channels and no sockets.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → connection id assigned
//! 2. Client sends events → dispatch → apply + relay to peers (never sender)
//! 3. Close → sender deregistered from every joined room; board state and
//!    rooms are left untouched

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::{ClientEvent, DropReason, ServerEvent};
use crate::services;
use crate::state::AppState;

/// Capacity of the per-connection relay channel. A client that cannot drain
/// this many pending events starts missing broadcasts (fire-and-forget).
const RELAY_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for events relayed from room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(RELAY_CHANNEL_CAPACITY);

    info!(%client_id, "ws: client connected");

    // Rooms this session has joined. The protocol has no leave event, so a
    // session that joins a second room stays subscribed to the first.
    let mut joined: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_event(&state, &mut joined, client_id, &client_tx, &text).await;
                        for event in replies {
                            let _ = send_event(&mut socket, &event).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Deregister from delivery only; rooms and their boards are retained.
    for room_id in &joined {
        services::room::leave_room(&state, room_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Parse and process one inbound text message. Returns the events to send
/// back to the sender; peer relays happen inside.
///
/// Every failure path drops the event and keeps the session alive — a bad
/// message from one client must never take down the shared room.
async fn process_event(
    state: &AppState,
    joined: &mut HashSet<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%client_id, error = %DropReason::from(e), "ws: dropped inbound event");
            return vec![];
        }
    };

    // Cursor traffic is too chatty to log.
    let is_cursor = matches!(event, ClientEvent::CursorMove { .. });
    if !is_cursor {
        info!(%client_id, event = event.name(), "ws: recv event");
    }

    match event {
        ClientEvent::JoinRoom { room_id } => {
            // Register and snapshot under one lock: the joiner must never
            // see a draw-action for a room it has no snapshot for.
            let snapshot =
                services::room::join_room(state, &room_id, client_id, client_tx.clone()).await;
            joined.insert(room_id);
            vec![ServerEvent::ServerState {
                drawables: snapshot.drawables,
                notes: snapshot.notes,
            }]
        }
        ClientEvent::DrawAction { room_id, action, object } => {
            match services::room::apply_draw_action(state, &room_id, action, &object).await {
                Ok(()) => {
                    // Relay the original event, modify-no-op included. The
                    // sender is excluded: it already applied its local copy.
                    let relay =
                        ServerEvent::DrawAction { room_id: room_id.clone(), action, object };
                    services::room::broadcast(state, &room_id, &relay, Some(client_id)).await;
                }
                Err(reason) => {
                    warn!(%client_id, %room_id, error = %reason, "ws: dropped draw-action");
                }
            }
            vec![]
        }
        ClientEvent::CursorMove { room_id, x, y, color, username } => {
            // No state change, no room check: an unknown room simply has no
            // recipients. The server-assigned connection id overrides any
            // client-supplied userId.
            let relay = ServerEvent::CursorMove { x, y, color, username, user_id: client_id };
            services::room::broadcast(state, &room_id, &relay, Some(client_id)).await;
            vec![]
        }
        ClientEvent::ClearCanvas { room_id } => {
            match services::room::clear_canvas(state, &room_id).await {
                Ok(()) => {
                    services::room::broadcast(state, &room_id, &ServerEvent::ClearCanvas, Some(client_id))
                        .await;
                }
                Err(reason) => {
                    warn!(%client_id, %room_id, error = %reason, "ws: dropped clear-canvas");
                }
            }
            vec![]
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
