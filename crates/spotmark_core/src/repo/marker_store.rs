//! Persistent marker store over key-value storage.
//!
//! # Responsibility
//! - Hold the whole marker collection as one JSON blob under a fixed key.
//! - Offer load-all / replace-all; no partial updates.
//!
//! # Invariants
//! - Write paths validate every marker and reject duplicate keys before
//!   touching storage.
//! - Read paths reject invalid persisted state instead of masking it; the
//!   caller decides how to recover.
//! - `load(save(m)) == m` for every collection `save` accepts.

use crate::model::marker::{Marker, MarkerKey, MarkerValidationError};
use crate::storage::kv::{KeyValueStorage, KvError};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Storage key holding the serialized marker collection.
pub const MARKERS_STORAGE_KEY: &str = "markers";

pub type StoreResult<T> = Result<T, StoreError>;

/// Marker store failure.
#[derive(Debug)]
pub enum StoreError {
    /// Storage could not be read.
    Read(KvError),
    /// Stored blob exists but does not decode into a valid collection.
    Corrupt(String),
    /// Collection rejected before writing.
    Invalid(MarkerValidationError),
    /// Two markers share one key.
    DuplicateKey(MarkerKey),
    /// Collection could not be serialized.
    Encode(serde_json::Error),
    /// Storage rejected the write.
    Write(KvError),
    /// No durable storage could be opened for this session.
    Unavailable(String),
}

impl StoreError {
    /// True for failures on the load path (`StorageReadFailure`).
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Corrupt(_))
    }

    /// True when no storage is reachable at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read stored markers: {err}"),
            Self::Corrupt(message) => write!(f, "stored markers are corrupt: {message}"),
            Self::Invalid(err) => write!(f, "refusing to store invalid marker: {err}"),
            Self::DuplicateKey(key) => write!(f, "duplicate marker key: {key}"),
            Self::Encode(err) => write!(f, "failed to encode markers: {err}"),
            Self::Write(err) => write!(f, "failed to write markers: {err}"),
            Self::Unavailable(reason) => write!(f, "marker storage unavailable: {reason}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read(err) | Self::Write(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Corrupt(_) | Self::DuplicateKey(_) | Self::Unavailable(_) => None,
        }
    }
}

/// Durable marker collection.
pub trait MarkerStore {
    /// Reads the full collection; empty when nothing was stored yet.
    fn load(&self) -> StoreResult<Vec<Marker>>;
    /// Replaces the full stored collection.
    fn save(&self, markers: &[Marker]) -> StoreResult<()>;
}

impl<T: MarkerStore + ?Sized> MarkerStore for &T {
    fn load(&self) -> StoreResult<Vec<Marker>> {
        (**self).load()
    }

    fn save(&self, markers: &[Marker]) -> StoreResult<()> {
        (**self).save(markers)
    }
}

impl<T: MarkerStore + ?Sized> MarkerStore for Box<T> {
    fn load(&self) -> StoreResult<Vec<Marker>> {
        (**self).load()
    }

    fn save(&self, markers: &[Marker]) -> StoreResult<()> {
        (**self).save(markers)
    }
}

/// Stand-in store for sessions whose storage could not be opened.
///
/// Every call fails with `StoreError::Unavailable`, so the session runs
/// from memory and reports each save as a write failure.
#[derive(Debug, Clone)]
pub struct UnavailableMarkerStore {
    reason: String,
}

impl UnavailableMarkerStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl MarkerStore for UnavailableMarkerStore {
    fn load(&self) -> StoreResult<Vec<Marker>> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    fn save(&self, markers: &[Marker]) -> StoreResult<()> {
        warn!(
            "event=marker_store_save module=repo status=error error_code=storage_unavailable count={}",
            markers.len()
        );
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

/// Marker store writing a JSON array under `MARKERS_STORAGE_KEY`.
pub struct KvMarkerStore<S: KeyValueStorage> {
    storage: S,
}

impl<S: KeyValueStorage> KvMarkerStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: KeyValueStorage> MarkerStore for KvMarkerStore<S> {
    fn load(&self) -> StoreResult<Vec<Marker>> {
        let started_at = Instant::now();
        let blob = match self.storage.get_item(MARKERS_STORAGE_KEY) {
            Ok(blob) => blob,
            Err(err) => {
                error!(
                    "event=marker_store_load module=repo status=error error_code=storage_read_failed error={}",
                    err
                );
                return Err(StoreError::Read(err));
            }
        };

        let Some(blob) = blob else {
            info!("event=marker_store_load module=repo status=ok count=0 first_run=true");
            return Ok(Vec::new());
        };

        match decode_markers(&blob) {
            Ok(markers) => {
                info!(
                    "event=marker_store_load module=repo status=ok count={} bytes={} duration_ms={}",
                    markers.len(),
                    blob.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(markers)
            }
            Err(err) => {
                warn!(
                    "event=marker_store_load module=repo status=error error_code=storage_corrupt bytes={} error={}",
                    blob.len(),
                    err
                );
                Err(err)
            }
        }
    }

    fn save(&self, markers: &[Marker]) -> StoreResult<()> {
        let started_at = Instant::now();
        ensure_valid_collection(markers)?;
        let blob = serde_json::to_string(markers).map_err(StoreError::Encode)?;

        if let Err(err) = self.storage.set_item(MARKERS_STORAGE_KEY, &blob) {
            error!(
                "event=marker_store_save module=repo status=error error_code=storage_write_failed count={} error={}",
                markers.len(),
                err
            );
            return Err(StoreError::Write(err));
        }

        info!(
            "event=marker_store_save module=repo status=ok count={} bytes={} duration_ms={}",
            markers.len(),
            blob.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

fn decode_markers(blob: &str) -> StoreResult<Vec<Marker>> {
    let markers: Vec<Marker> = serde_json::from_str(blob)
        .map_err(|err| StoreError::Corrupt(format!("invalid JSON: {err}")))?;

    let mut seen = HashSet::with_capacity(markers.len());
    for marker in &markers {
        marker
            .validate()
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;
        if !seen.insert(&marker.key) {
            return Err(StoreError::Corrupt(format!(
                "duplicate marker key `{}`",
                marker.key
            )));
        }
    }
    Ok(markers)
}

fn ensure_valid_collection(markers: &[Marker]) -> StoreResult<()> {
    let mut seen = HashSet::with_capacity(markers.len());
    for marker in markers {
        marker.validate().map_err(StoreError::Invalid)?;
        if !seen.insert(&marker.key) {
            return Err(StoreError::DuplicateKey(marker.key.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{decode_markers, MarkerStore, StoreError, UnavailableMarkerStore};
    use crate::model::marker::{Coordinate, Marker};

    #[test]
    fn unavailable_store_fails_both_directions() {
        let store: Box<dyn MarkerStore> = Box::new(UnavailableMarkerStore::new("disk gone"));
        let load_err = store.load().unwrap_err();
        assert!(load_err.is_unavailable());
        assert!(load_err.to_string().contains("disk gone"));

        let marker = Marker::new(Coordinate::new(60.17, 24.94));
        assert!(store.save(&[marker]).unwrap_err().is_unavailable());
    }

    #[test]
    fn decode_accepts_legacy_random_keys_and_null_names() {
        let blob = r#"[
            {"key":"0.4417","coordinate":{"latitude":60.17,"longitude":24.94},"name":null},
            {"key":"0.9","coordinate":{"latitude":61.0,"longitude":25.0}}
        ]"#;
        let markers = decode_markers(blob).unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].key.as_str(), "0.4417");
        assert!(markers.iter().all(|marker| marker.name.is_none()));
    }

    #[test]
    fn decode_rejects_duplicate_keys() {
        let blob = r#"[
            {"key":"a","coordinate":{"latitude":1.0,"longitude":1.0},"name":null},
            {"key":"a","coordinate":{"latitude":2.0,"longitude":2.0},"name":null}
        ]"#;
        let err = decode_markers(blob).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref message) if message.contains("duplicate")));
        assert!(err.is_read_failure());
    }

    #[test]
    fn decode_rejects_non_array_blob() {
        let err = decode_markers(r#"{"markers":[]}"#).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
