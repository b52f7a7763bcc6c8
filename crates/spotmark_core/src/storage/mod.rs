//! Durable key-value storage used by the persistence layer.
//!
//! # Responsibility
//! - Abstract the platform key-value store behind one small trait.
//! - Provide SQLite and in-memory backends.

pub mod kv;
