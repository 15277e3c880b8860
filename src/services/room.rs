//! Room service — registry operations, board mutation, and broadcast.
//!
//! DESIGN
//! ======
//! The registry is the single source of truth per room. Joining ensures the
//! room exists, registers the client's sender, and snapshots the board under
//! the same write lock — a joiner can never observe a draw-action for a room
//! it has not received the snapshot for.
//!
//! ERROR HANDLING
//! ==============
//! Mutations against unknown rooms and payloads without a usable id return a
//! [`DropReason`]; the caller logs and discards. Nothing is surfaced to the
//! originating client — the shared session stays available over per-client
//! feedback.

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::event::{Action, DropReason, ServerEvent, object_id};
use crate::state::{AppState, Note, RoomState};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Full board state at a point in time, cloned out of the registry.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub drawables: Vec<serde_json::Value>,
    pub notes: Vec<Note>,
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Join a room, creating it on first reference. Registers the client's
/// sender and returns the board snapshot taken at the moment of join.
/// Idempotent per client; always succeeds.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    tx: mpsc::Sender<ServerEvent>,
) -> Snapshot {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .entry(room_id.to_owned())
        .or_insert_with(RoomState::new);
    room.clients.insert(client_id, tx);

    info!(room_id, %client_id, clients = room.clients.len(), "client joined room");
    Snapshot { drawables: room.drawables.clone(), notes: room.notes.clone() }
}

/// Remove a client's sender from a room. Board content is untouched and the
/// room is retained even when empty — there is no eviction.
pub async fn leave_room(state: &AppState, room_id: &str, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };
    room.clients.remove(&client_id);
    info!(room_id, %client_id, remaining = room.clients.len(), "client left room");
}

// =============================================================================
// MUTATION
// =============================================================================

/// Apply a `draw-action` to a room's board state.
///
/// Last-writer-wins by arrival order: `add` appends, `modify` replaces the
/// matching id in place (no-op if absent — the event is still worth relaying,
/// the caller decides), `add-note` upserts by id.
///
/// # Errors
///
/// Returns a [`DropReason`] if the room does not exist or the payload lacks
/// a usable id; the event must then be dropped without relay.
pub async fn apply_draw_action(
    state: &AppState,
    room_id: &str,
    action: Action,
    object: &serde_json::Value,
) -> Result<(), DropReason> {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return Err(DropReason::UnknownRoom(room_id.to_owned()));
    };

    match action {
        Action::Add => {
            let Some(id) = object_id(object) else {
                return Err(DropReason::MissingObjectId);
            };
            room.drawables.push(object.clone());
            info!(room_id, id, total = room.drawables.len(), "drawable added");
        }
        Action::Modify => {
            let Some(id) = object_id(object) else {
                return Err(DropReason::MissingObjectId);
            };
            // No-op when the id is unknown: tolerates an add/modify race
            // where the modify outruns the add. The join snapshot self-heals
            // any client that reconnects.
            if let Some(existing) = room
                .drawables
                .iter_mut()
                .find(|d| object_id(d) == Some(id))
            {
                *existing = object.clone();
                info!(room_id, id, "drawable modified");
            }
        }
        Action::AddNote => {
            let note: Note = serde_json::from_value(object.clone())?;
            if let Some(existing) = room.notes.iter_mut().find(|n| n.id == note.id) {
                *existing = note;
            } else {
                room.notes.push(note);
            }
            info!(room_id, total = room.notes.len(), "note upserted");
        }
    }
    Ok(())
}

/// Reset a room's drawables and notes to empty.
///
/// # Errors
///
/// Returns [`DropReason::UnknownRoom`] if the room does not exist.
pub async fn clear_canvas(state: &AppState, room_id: &str) -> Result<(), DropReason> {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return Err(DropReason::UnknownRoom(room_id.to_owned()));
    };
    room.drawables.clear();
    room.notes.clear();
    info!(room_id, "canvas cleared");
    Ok(())
}

// =============================================================================
// LOOKUP
// =============================================================================

/// Pure lookup of a room's board state. Never creates.
pub async fn snapshot(state: &AppState, room_id: &str) -> Option<Snapshot> {
    let rooms = state.rooms.read().await;
    rooms
        .get(room_id)
        .map(|room| Snapshot { drawables: room.drawables.clone(), notes: room.notes.clone() })
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Send an event to every client in a room except `exclude` (the sender).
/// Fire-and-forget: a client whose channel is full is skipped, and a missing
/// room simply has no recipients.
pub async fn broadcast(state: &AppState, room_id: &str, event: &ServerEvent, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };

    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        let _ = tx.try_send(event.clone());
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
