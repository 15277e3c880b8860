//! Wire protocol — the named events exchanged over a board connection.
//!
//! ARCHITECTURE
//! ============
//! Every message is a single JSON object tagged by an `event` field. Clients
//! send [`ClientEvent`]s, the server applies them against room state and
//! relays [`ServerEvent`]s to the other members of the room. Event and field
//! names are fixed by the protocol (`join-room`, `draw-action`, `roomId`, …)
//! and must not change.
//!
//! DESIGN
//! ======
//! - Drawable payloads are opaque `serde_json::Value`s. The server never
//!   interprets geometry; the only contractual requirement is a string `id`
//!   field, extracted via [`object_id`].
//! - Notes are the one typed payload (`add-note` upserts by id), see
//!   [`crate::state::Note`].
//! - Nothing here is an error surfaced to a client: a bad inbound event is
//!   classified as a [`DropReason`], logged, and discarded.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::Note;

// =============================================================================
// DRAW ACTIONS
// =============================================================================

/// The mutation kind carried by a `draw-action` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Append an opaque drawable to the room's sequence.
    Add,
    /// Replace the drawable with the matching id in place. No-op if absent.
    Modify,
    /// Upsert a note by id: replace if present, append if absent.
    AddNote,
}

// =============================================================================
// CLIENT → SERVER
// =============================================================================

/// Events a client may send. Unknown `event` tags fail to parse and the
/// message is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Join a room, creating it if needed. Answered with `server-state`.
    JoinRoom { room_id: String },
    /// Mutate board state and relay to room peers.
    DrawAction {
        room_id: String,
        action: Action,
        object: serde_json::Value,
    },
    /// Ephemeral cursor position. Never persisted; relayed with the
    /// server-assigned `userId` regardless of what the client supplied.
    CursorMove {
        room_id: String,
        x: f64,
        y: f64,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    /// Reset the room's drawables and notes to empty.
    ClearCanvas { room_id: String },
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::DrawAction { .. } => "draw-action",
            Self::CursorMove { .. } => "cursor-move",
            Self::ClearCanvas { .. } => "clear-canvas",
        }
    }
}

// =============================================================================
// SERVER → CLIENT
// =============================================================================

/// Events the server delivers to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full board snapshot, sent to a session immediately after it joins.
    /// The receiver is expected to replace its local state entirely.
    ServerState {
        drawables: Vec<serde_json::Value>,
        notes: Vec<Note>,
    },
    /// A peer's draw action, relayed verbatim.
    DrawAction {
        room_id: String,
        action: Action,
        object: serde_json::Value,
    },
    /// A peer's cursor. `user_id` is the sender's connection id, assigned by
    /// the server — never taken from the client payload.
    CursorMove {
        x: f64,
        y: f64,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        user_id: Uuid,
    },
    /// Bare notification that a peer cleared the board.
    ClearCanvas,
}

// =============================================================================
// DROP CLASSIFICATION
// =============================================================================

/// Why an inbound event was discarded. Logged at `warn`, never sent back —
/// the session keeps running (availability over per-client feedback).
#[derive(Debug, thiserror::Error)]
pub enum DropReason {
    #[error("invalid json: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("object id missing or not a string")]
    MissingObjectId,
    #[error("unknown room: {0}")]
    UnknownRoom(String),
}

// =============================================================================
// HELPERS
// =============================================================================

/// Extract the contractual `id` field from an opaque drawable payload.
#[must_use]
pub fn object_id(object: &serde_json::Value) -> Option<&str> {
    object.get("id").and_then(serde_json::Value::as_str)
}

// =============================================================================
// TESTS
// =============================================================================
