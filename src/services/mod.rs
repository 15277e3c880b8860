//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the registry mutation and broadcast logic so the
//! route handler can stay focused on protocol translation.

pub mod room;
