//! Domain model for map markers.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the persisted JSON shape stable across app launches.
//!
//! # Invariants
//! - Every marker is identified by a stable `MarkerKey`.
//! - Deletion is a hard removal from the collection; no tombstones.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod marker;
