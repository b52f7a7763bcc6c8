//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the marker session to Dart via FRB as use-case level functions.
//! - Own the one process-wide session and its SQLite connection.
//! - Turn host position fixes into map regions.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every marker call returns an envelope carrying the post-call editor state.
//! - A session always exists after the first call; when the database cannot
//!   be opened it runs from memory and reports storage notices.
//!
//! # See also
//! - docs/architecture/logging.md

use spotmark_core::db::open_db;
use spotmark_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    locate_initial_region, ping as ping_inner, recenter_region, Coordinate, EditAction,
    EditorState, GeolocationProvider, KvMarkerStore, LocationError, MapEvent, MapRegion,
    MarkerCategory, MarkerKey, MarkerSession, MarkerStore, MarkerView, PermissionStatus,
    SessionError, SqliteKeyValueStorage, UnavailableMarkerStore,
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

const MARKERS_DB_FILE_NAME: &str = "spotmark_markers.sqlite3";
static MARKERS_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static SESSION: Mutex<Option<FfiSession>> = Mutex::new(None);

type FfiSession = MarkerSession<Box<dyn MarkerStore + Send>>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Marker as rendered on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerItem {
    pub key: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Name, or the default label for unnamed markers.
    pub label: String,
    /// Icon asset id; `None` renders the default pin.
    pub icon_id: Option<String>,
}

/// Editing modal state; `None` in envelopes means the modal is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorItem {
    pub key: String,
    pub draft_name: String,
}

/// Category choice offered by the editing modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub label: String,
    pub icon_id: String,
}

/// Response envelope for every marker call.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Stable error code (`not_found|no_active_edit|empty_name|invalid_coordinate`).
    pub error_code: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
    /// Full marker list after the call.
    pub markers: Vec<MarkerItem>,
    /// Editing modal state after the call.
    pub editor: Option<EditorItem>,
    /// Storage notices (read/write failures) raised since the previous call.
    pub notices: Vec<String>,
}

impl MarkerActionResponse {
    fn from_session(session: &mut FfiSession, outcome: Result<&'static str, SessionError>) -> Self {
        let notices = session
            .take_notices()
            .into_iter()
            .map(|notice| notice.user_message().to_string())
            .collect();
        let (ok, error_code, message) = match outcome {
            Ok(message) => (true, None, message.to_string()),
            Err(err) => (
                false,
                Some(session_error_code(&err).to_string()),
                err.to_string(),
            ),
        };

        Self {
            ok,
            error_code,
            message,
            markers: session.marker_views().into_iter().map(to_marker_item).collect(),
            editor: to_editor_item(session.editor_state()),
            notices,
        }
    }
}

/// Map region for the host map view.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRegionResponse {
    pub ok: bool,
    /// Stable error code (`permission_denied|location_unavailable`).
    pub error_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
    /// Alert dialog title when `ok` is false.
    pub alert_title: Option<String>,
    /// Alert dialog body when `ok` is false.
    pub alert_message: Option<String>,
}

impl MapRegionResponse {
    fn from_result(result: Result<MapRegion, LocationError>) -> Self {
        match result {
            Ok(region) => Self {
                ok: true,
                error_code: None,
                latitude: region.center.latitude,
                longitude: region.center.longitude,
                latitude_delta: region.latitude_delta,
                longitude_delta: region.longitude_delta,
                alert_title: None,
                alert_message: None,
            },
            Err(err) => Self {
                ok: false,
                error_code: Some(location_error_code(&err).to_string()),
                latitude: 0.0,
                longitude: 0.0,
                latitude_delta: 0.0,
                longitude_delta: 0.0,
                alert_title: Some(err.alert_title().to_string()),
                alert_message: Some(err.alert_message().to_string()),
            },
        }
    }
}

/// Position the host already obtained from the platform location service.
struct HostFix {
    permission: PermissionStatus,
    position: Option<Coordinate>,
}

impl GeolocationProvider for HostFix {
    fn request_permission(&mut self) -> PermissionStatus {
        self.permission
    }

    fn current_position(&mut self) -> Result<Coordinate, LocationError> {
        self.position.ok_or_else(|| {
            LocationError::LocationUnavailable("host reported no position".to_string())
        })
    }
}

/// Resolves the region the map opens at on launch.
///
/// Input semantics:
/// - `permission_granted`: outcome of the host permission prompt.
/// - `latitude`/`longitude`: current fix, `None` when the host has none.
///
/// # FFI contract
/// - Sync call, no I/O.
/// - Never panics; failures carry alert text and the map stays unrendered.
#[flutter_rust_bridge::frb(sync)]
pub fn map_initial_region(
    permission_granted: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> MapRegionResponse {
    let permission = if permission_granted {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    };
    let mut fix = HostFix {
        permission,
        position: host_position(latitude, longitude),
    };
    MapRegionResponse::from_result(locate_initial_region(&mut fix))
}

/// Region for the "return to current location" button.
#[flutter_rust_bridge::frb(sync)]
pub fn map_recenter_region(latitude: Option<f64>, longitude: Option<f64>) -> MapRegionResponse {
    let mut fix = HostFix {
        permission: PermissionStatus::Granted,
        position: host_position(latitude, longitude),
    };
    MapRegionResponse::from_result(recenter_region(&mut fix))
}

/// Loads stored markers (first call) and returns the current map state.
///
/// # FFI contract
/// - Sync call, DB-backed on first use.
/// - Never panics; unreadable storage starts an empty session with a notice.
#[flutter_rust_bridge::frb(sync)]
pub fn map_load() -> MarkerActionResponse {
    with_session(|_| Ok("Map loaded."))
}

/// Handles a long press: creates an unnamed marker and opens it for naming.
#[flutter_rust_bridge::frb(sync)]
pub fn map_long_press(latitude: f64, longitude: f64) -> MarkerActionResponse {
    with_session(|session| {
        session
            .handle_map_event(MapEvent::LongPress(Coordinate::new(latitude, longitude)))
            .map(|_| "Marker created.")
    })
}

/// Handles a tap on a marker: opens it for renaming.
#[flutter_rust_bridge::frb(sync)]
pub fn marker_activate(key: String) -> MarkerActionResponse {
    with_session(|session| {
        session
            .handle_map_event(MapEvent::MarkerActivate(MarkerKey::from(key)))
            .map(|_| "Editing marker.")
    })
}

/// Mirrors the editing modal text field into the active draft.
#[flutter_rust_bridge::frb(sync)]
pub fn marker_set_draft(text: String) -> MarkerActionResponse {
    with_session(|session| session.set_draft_name(text).map(|()| "Draft updated."))
}

/// Editing modal "Save" button.
#[flutter_rust_bridge::frb(sync)]
pub fn marker_save(name: String) -> MarkerActionResponse {
    with_session(|session| {
        session
            .handle_edit_action(EditAction::Save(name))
            .map(|_| "Marker saved.")
    })
}

/// Editing modal "Delete" button.
#[flutter_rust_bridge::frb(sync)]
pub fn marker_delete() -> MarkerActionResponse {
    with_session(|session| {
        session
            .handle_edit_action(EditAction::Delete)
            .map(|_| "Marker deleted.")
    })
}

/// Editing modal "Close" button.
#[flutter_rust_bridge::frb(sync)]
pub fn marker_close() -> MarkerActionResponse {
    with_session(|session| {
        session
            .handle_edit_action(EditAction::Close)
            .map(|_| "Editor closed.")
    })
}

/// Lists the fixed category set for the editing modal.
#[flutter_rust_bridge::frb(sync)]
pub fn marker_categories() -> Vec<CategoryItem> {
    MarkerCategory::all()
        .iter()
        .map(|category| CategoryItem {
            label: category.label().to_string(),
            icon_id: category.icon_id().to_string(),
        })
        .collect()
}

fn with_session(
    f: impl FnOnce(&mut FfiSession) -> Result<&'static str, SessionError>,
) -> MarkerActionResponse {
    let mut guard = SESSION
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let session = guard.get_or_insert_with(|| open_session(&resolve_markers_db_path()));
    run_on(session, f)
}

fn run_on(
    session: &mut FfiSession,
    f: impl FnOnce(&mut FfiSession) -> Result<&'static str, SessionError>,
) -> MarkerActionResponse {
    let outcome = f(session);
    MarkerActionResponse::from_session(session, outcome)
}

/// Opens the marker session; falls back to a memory-only session when the
/// database cannot be opened.
fn open_session(db_path: &Path) -> FfiSession {
    let store: Box<dyn MarkerStore + Send> = match open_db(db_path) {
        Ok(conn) => Box::new(KvMarkerStore::new(SqliteKeyValueStorage::new(conn))),
        Err(err) => {
            log::error!(
                "event=ffi_session_open module=ffi status=degraded error_code=db_open_failed error={}",
                err
            );
            Box::new(UnavailableMarkerStore::new(err.to_string()))
        }
    };
    MarkerSession::initialize(store)
}

fn resolve_markers_db_path() -> PathBuf {
    MARKERS_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("SPOTMARK_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(MARKERS_DB_FILE_NAME)
        })
        .clone()
}

fn session_error_code(err: &SessionError) -> &'static str {
    match err {
        SessionError::NotFound(_) => "not_found",
        SessionError::NoActiveEdit => "no_active_edit",
        SessionError::EmptyName => "empty_name",
        SessionError::InvalidCoordinate(_) => "invalid_coordinate",
    }
}

fn location_error_code(err: &LocationError) -> &'static str {
    match err {
        LocationError::PermissionDenied => "permission_denied",
        LocationError::LocationUnavailable(_) => "location_unavailable",
    }
}

fn host_position(latitude: Option<f64>, longitude: Option<f64>) -> Option<Coordinate> {
    Some(Coordinate::new(latitude?, longitude?))
}

fn to_marker_item(view: MarkerView) -> MarkerItem {
    MarkerItem {
        key: view.key.to_string(),
        latitude: view.coordinate.latitude,
        longitude: view.coordinate.longitude,
        label: view.label,
        icon_id: view.category.map(|category| category.icon_id().to_string()),
    }
}

fn to_editor_item(state: EditorState) -> Option<EditorItem> {
    match state {
        EditorState::Open { key, draft_name } => Some(EditorItem {
            key: key.to_string(),
            draft_name,
        }),
        EditorState::Closed => None,
    }
}
