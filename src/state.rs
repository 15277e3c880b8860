//! Shared application state — the room registry and per-room board state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the registry: a map from opaque room id to live `RoomState`. Rooms
//! are created lazily on first join and kept for the process lifetime —
//! there is no eviction policy, so a late joiner to an idle room still gets
//! its board. All board mutations happen under the registry write lock, so
//! no two mutations to the same room can interleave.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::event::ServerEvent;

// =============================================================================
// NOTE
// =============================================================================

/// A positioned text note. The one payload the server parses: `add-note`
/// upserts by id, so the id has to be a typed field rather than an opaque
/// blob. Optional fields are omitted from JSON when absent, matching what
/// clients send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state: the authoritative board plus connected clients.
///
/// Both sequences are append-ordered; a join snapshot clones them as-is so a
/// late joiner sees exactly the order the room produced.
pub struct RoomState {
    /// Opaque drawable payloads, in arrival order. Ids are unique within the
    /// sequence (client-generated).
    pub drawables: Vec<serde_json::Value>,
    /// Notes, in arrival order, upserted by id.
    pub notes: Vec<Note>,
    /// Connected clients: connection id -> sender for relayed events.
    pub clients: HashMap<Uuid, mpsc::Sender<ServerEvent>>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self { drawables: Vec::new(), notes: Vec::new(), clients: HashMap::new() }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum — the registry is
/// Arc-wrapped so all handlers see the same map.
#[derive(Clone)]
pub struct AppState {
    /// Room registry: room id -> board state. The only mutable shared
    /// resource in the server.
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
