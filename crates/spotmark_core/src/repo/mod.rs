//! Repository layer over durable storage.
//!
//! # Responsibility
//! - Define the marker persistence contract used by the session controller.
//! - Isolate serialization and storage details from business orchestration.
//!
//! # Invariants
//! - Every write replaces the whole collection.
//! - Repository APIs return semantic errors (`Corrupt`, `DuplicateKey`) in
//!   addition to storage transport errors.

pub mod marker_store;
