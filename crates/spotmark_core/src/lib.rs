//! Core domain logic for Spotmark.
//! This crate is the single source of truth for marker invariants.

pub mod db;
pub mod location;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use location::{
    locate_initial_region, recenter_region, GeolocationProvider, LocationError, MapRegion,
    PermissionStatus,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::marker::{
    normalize_marker_name, Coordinate, Marker, MarkerCategory, MarkerKey, MarkerValidationError,
    DEFAULT_MARKER_LABEL,
};
pub use repo::marker_store::{
    KvMarkerStore, MarkerStore, StoreError, StoreResult, UnavailableMarkerStore,
    MARKERS_STORAGE_KEY,
};
pub use service::interaction::{EditAction, EditorState, MapEvent};
pub use service::marker_session::{
    ActiveEdit, MarkerSession, MarkerView, MutationReport, SessionError, SessionNotice,
};
pub use storage::kv::{
    KeyValueStorage, KvError, KvResult, MemoryKeyValueStorage, SqliteKeyValueStorage,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
