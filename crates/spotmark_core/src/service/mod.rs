//! Core use-case services.
//!
//! # Responsibility
//! - Own the marker session state machine.
//! - Translate map/editing surface events into session operations.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod interaction;
pub mod marker_session;
