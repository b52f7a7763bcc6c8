//! Flutter bridge for Spotmark core.

pub mod api;
