//! Marker session controller.
//!
//! # Responsibility
//! - Own the in-memory marker collection and the single active edit slot.
//! - Drive the create -> name -> rename/delete lifecycle.
//! - Rewrite the full collection to the store after every mutation.
//!
//! # Invariants
//! - At most one marker is under edit at a time.
//! - Committed names are trimmed and never empty.
//! - Validation failures leave the collection and the edit slot untouched.
//! - A failed save is reported as a notice and never rolls back memory.
//!
//! # See also
//! - docs/architecture/marker-session.md

use crate::model::marker::{
    normalize_marker_name, Coordinate, Marker, MarkerCategory, MarkerKey, MarkerValidationError,
};
use crate::repo::marker_store::{MarkerStore, StoreError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Marker currently being named or renamed in the editing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEdit {
    pub key: MarkerKey,
    pub draft_name: String,
}

/// Synchronous, user-correctable failures of session operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// No marker with this key exists in the collection.
    NotFound(MarkerKey),
    /// Save/delete requested while no marker is under edit.
    NoActiveEdit,
    /// Draft name is empty after trimming.
    EmptyName,
    /// Long-press delivered a coordinate outside valid bounds.
    InvalidCoordinate(MarkerValidationError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "marker not found: {key}"),
            Self::NoActiveEdit => write!(f, "no marker is being edited"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidCoordinate(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCoordinate(err) => Some(err),
            _ => None,
        }
    }
}

/// Non-fatal storage condition the host should surface to the user.
///
/// Write failures share their error with the `MutationReport` of the
/// mutation that triggered the save.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    /// Stored markers could not be read; the session started empty.
    StorageReadFailure(Arc<StoreError>),
    /// A save failed; memory keeps the change until the next successful save.
    StorageWriteFailure(Arc<StoreError>),
}

impl SessionNotice {
    /// Short user-facing alert text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::StorageReadFailure(_) => "Saved places could not be loaded.",
            Self::StorageWriteFailure(_) => "Changes could not be saved.",
        }
    }

    pub fn error(&self) -> &StoreError {
        match self {
            Self::StorageReadFailure(err) | Self::StorageWriteFailure(err) => err.as_ref(),
        }
    }
}

impl Display for SessionNotice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.user_message(), self.error())
    }
}

/// Result of a successful mutation.
#[derive(Debug, Clone)]
pub struct MutationReport {
    /// Marker the mutation applied to.
    pub key: MarkerKey,
    /// Error of the follow-up save; `None` when it reached storage.
    pub persist_error: Option<Arc<StoreError>>,
}

impl MutationReport {
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Render projection of one marker for the map surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub key: MarkerKey,
    pub coordinate: Coordinate,
    pub label: String,
    /// `None` renders the default pin.
    pub category: Option<MarkerCategory>,
}

/// Single owner of the marker collection for one app session.
pub struct MarkerSession<S: MarkerStore> {
    store: S,
    markers: Vec<Marker>,
    active_edit: Option<ActiveEdit>,
    notices: Vec<SessionNotice>,
}

impl<S: MarkerStore> MarkerSession<S> {
    /// Loads the stored collection and starts a session.
    ///
    /// A load failure never aborts startup: the session starts empty and a
    /// `StorageReadFailure` notice is queued. This is the only read path.
    pub fn initialize(store: S) -> Self {
        let mut notices = Vec::new();
        let markers = match store.load() {
            Ok(markers) => markers,
            Err(err) => {
                warn!(
                    "event=session_init module=session status=recovered error_code=storage_read_failed error={}",
                    err
                );
                notices.push(SessionNotice::StorageReadFailure(Arc::new(err)));
                Vec::new()
            }
        };

        info!(
            "event=session_init module=session status=ok count={}",
            markers.len()
        );
        Self {
            store,
            markers,
            active_edit: None,
            notices,
        }
    }

    /// Current collection in insertion order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, key: &MarkerKey) -> Option<&Marker> {
        self.markers.iter().find(|marker| &marker.key == key)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn active_edit(&self) -> Option<&ActiveEdit> {
        self.active_edit.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drains queued storage notices.
    pub fn take_notices(&mut self) -> Vec<SessionNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Projects markers for rendering: label plus optional icon category.
    pub fn marker_views(&self) -> Vec<MarkerView> {
        self.markers
            .iter()
            .map(|marker| MarkerView {
                key: marker.key.clone(),
                coordinate: marker.coordinate,
                label: marker.display_label().to_string(),
                category: marker.category(),
            })
            .collect()
    }

    /// Appends an unnamed marker, persists, and opens it for naming.
    ///
    /// Any unsaved draft from a previous edit is discarded.
    ///
    /// # Errors
    /// - `InvalidCoordinate` when the coordinate is out of range; nothing changes.
    pub fn create_marker_at(
        &mut self,
        coordinate: Coordinate,
    ) -> Result<MutationReport, SessionError> {
        coordinate
            .validate()
            .map_err(SessionError::InvalidCoordinate)?;

        let marker = Marker::new(coordinate);
        let key = marker.key.clone();
        self.markers.push(marker);
        let persist_error = self.persist("marker_create");
        self.active_edit = Some(ActiveEdit {
            key: key.clone(),
            draft_name: String::new(),
        });

        Ok(MutationReport { key, persist_error })
    }

    /// Opens an existing marker for renaming.
    ///
    /// The draft starts from the current name, or empty when unnamed.
    ///
    /// # Errors
    /// - `NotFound` when `key` is not in the collection; the slot is unchanged.
    pub fn begin_edit(&mut self, key: &MarkerKey) -> Result<&ActiveEdit, SessionError> {
        let marker = self
            .marker(key)
            .ok_or_else(|| SessionError::NotFound(key.clone()))?;
        let draft_name = marker.name.clone().unwrap_or_default();

        if let Some(previous) = &self.active_edit {
            if &previous.key != key {
                debug!("event=edit_discard module=session status=ok reason=begin_edit");
            }
        }

        let active = self.active_edit.insert(ActiveEdit {
            key: key.clone(),
            draft_name,
        });
        Ok(&*active)
    }

    /// Updates the draft bound to the editing surface text field.
    ///
    /// # Errors
    /// - `NoActiveEdit` when no marker is under edit.
    pub fn set_draft_name(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let active = self
            .active_edit
            .as_mut()
            .ok_or(SessionError::NoActiveEdit)?;
        active.draft_name = text.into();
        Ok(())
    }

    /// Stores the trimmed draft as the marker name and closes the edit.
    ///
    /// # Errors
    /// - `NoActiveEdit` when no marker is under edit.
    /// - `EmptyName` when the draft is blank; collection and slot unchanged.
    /// - `NotFound` when the edited marker is no longer in the collection.
    pub fn commit_edit(&mut self, draft_name: &str) -> Result<MutationReport, SessionError> {
        let key = self
            .active_edit
            .as_ref()
            .map(|active| active.key.clone())
            .ok_or(SessionError::NoActiveEdit)?;
        let name = normalize_marker_name(draft_name).ok_or(SessionError::EmptyName)?;

        let Some(marker) = self.markers.iter_mut().find(|marker| marker.key == key) else {
            self.active_edit = None;
            return Err(SessionError::NotFound(key));
        };
        marker.name = Some(name);

        let persist_error = self.persist("marker_rename");
        self.active_edit = None;
        Ok(MutationReport { key, persist_error })
    }

    /// Removes the marker under edit and closes the edit.
    ///
    /// # Errors
    /// - `NoActiveEdit` when no marker is under edit; nothing changes.
    pub fn delete_active(&mut self) -> Result<MutationReport, SessionError> {
        let key = self
            .active_edit
            .take()
            .map(|active| active.key)
            .ok_or(SessionError::NoActiveEdit)?;

        let before = self.markers.len();
        self.markers.retain(|marker| marker.key != key);
        if self.markers.len() == before {
            return Err(SessionError::NotFound(key));
        }

        let persist_error = self.persist("marker_delete");
        Ok(MutationReport { key, persist_error })
    }

    /// Closes the edit without touching the collection. No-op when idle.
    pub fn cancel_edit(&mut self) {
        if self.active_edit.take().is_some() {
            debug!("event=edit_cancel module=session status=ok");
        }
    }

    fn persist(&mut self, event: &'static str) -> Option<Arc<StoreError>> {
        match self.store.save(&self.markers) {
            Ok(()) => {
                info!(
                    "event={} module=session status=ok count={}",
                    event,
                    self.markers.len()
                );
                None
            }
            Err(err) => {
                error!(
                    "event={} module=session status=error error_code=storage_write_failed count={} error={}",
                    event,
                    self.markers.len(),
                    err
                );
                let err = Arc::new(err);
                self.notices
                    .push(SessionNotice::StorageWriteFailure(Arc::clone(&err)));
                Some(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerSession, SessionError};
    use crate::model::marker::Coordinate;
    use crate::repo::marker_store::KvMarkerStore;
    use crate::storage::kv::MemoryKeyValueStorage;

    fn session() -> MarkerSession<KvMarkerStore<MemoryKeyValueStorage>> {
        MarkerSession::initialize(KvMarkerStore::new(MemoryKeyValueStorage::new()))
    }

    #[test]
    fn create_opens_empty_draft_for_new_marker() {
        let mut session = session();
        let report = session
            .create_marker_at(Coordinate::new(60.17, 24.94))
            .unwrap();

        assert!(report.is_persisted());
        let active = session.active_edit().expect("new marker should be under edit");
        assert_eq!(active.key, report.key);
        assert!(active.draft_name.is_empty());
        assert!(session.marker(&report.key).unwrap().name.is_none());
    }

    #[test]
    fn invalid_coordinate_leaves_session_untouched() {
        let mut session = session();
        let err = session
            .create_marker_at(Coordinate::new(120.0, 0.0))
            .unwrap_err();

        assert!(matches!(err, SessionError::InvalidCoordinate(_)));
        assert!(session.is_empty());
        assert!(session.active_edit().is_none());
    }

    #[test]
    fn set_draft_requires_active_edit() {
        let mut session = session();
        assert_eq!(
            session.set_draft_name("Kanttarelli"),
            Err(SessionError::NoActiveEdit)
        );
    }

    #[test]
    fn empty_name_error_reads_as_user_message() {
        assert_eq!(SessionError::EmptyName.to_string(), "name must not be empty");
    }
}
