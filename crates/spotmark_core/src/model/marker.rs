//! Marker domain model.
//!
//! # Responsibility
//! - Define the canonical map marker record and its persisted shape.
//! - Map marker names onto the fixed category set used for pin icons.
//!
//! # Invariants
//! - `key` is stable for the marker lifetime and never reused.
//! - `coordinate` is immutable after creation.
//! - `name`, when set, is never blank (enforced by `validate()` and at
//!   commit time in the session controller).
//!
//! # See also
//! - docs/architecture/data-model.md

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Label shown for markers that have not been named yet.
pub const DEFAULT_MARKER_LABEL: &str = "Sienipaikka";

/// Opaque marker identifier.
///
/// Newly created markers get a UUID v4 string, but any non-blank string is
/// accepted from storage so records written by earlier app builds still load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerKey(String);

impl MarkerKey {
    /// Generates a fresh key. Uniqueness is the only requirement.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for MarkerKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MarkerKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for MarkerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks that both components are finite and inside WGS84 bounds.
    pub fn validate(&self) -> Result<(), MarkerValidationError> {
        let latitude_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let longitude_ok =
            self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if latitude_ok && longitude_ok {
            return Ok(());
        }

        Err(MarkerValidationError::InvalidCoordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

/// Validation failures for marker records.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerValidationError {
    BlankKey,
    InvalidCoordinate { latitude: f64, longitude: f64 },
    BlankName(MarkerKey),
}

impl Display for MarkerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankKey => write!(f, "marker key must not be blank"),
            Self::InvalidCoordinate {
                latitude,
                longitude,
            } => write!(
                f,
                "invalid coordinate ({latitude}, {longitude}); expected latitude in [-90, 90] and longitude in [-180, 180]"
            ),
            Self::BlankName(key) => write!(f, "marker {key} has a blank name"),
        }
    }
}

impl Error for MarkerValidationError {}

/// Fixed mushroom category set offered by the editing surface.
///
/// Names outside this set are kept as free text and rendered with the
/// default pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerCategory {
    Chanterelle,
    FunnelChanterelle,
    Porcini,
    BlackTrumpet,
}

const ALL_CATEGORIES: &[MarkerCategory] = &[
    MarkerCategory::Chanterelle,
    MarkerCategory::FunnelChanterelle,
    MarkerCategory::Porcini,
    MarkerCategory::BlackTrumpet,
];

impl MarkerCategory {
    /// All categories in the order the editing surface lists them.
    pub fn all() -> &'static [MarkerCategory] {
        ALL_CATEGORIES
    }

    /// Display name stored in `Marker::name` when the category is picked.
    pub fn label(self) -> &'static str {
        match self {
            Self::Chanterelle => "Kanttarelli",
            Self::FunnelChanterelle => "Suppilovahvero",
            Self::Porcini => "Herkkutatti",
            Self::BlackTrumpet => "Mustatorvisieni",
        }
    }

    /// Stable id used by hosts to pick an icon asset.
    pub fn icon_id(self) -> &'static str {
        match self {
            Self::Chanterelle => "chanterelle",
            Self::FunnelChanterelle => "funnel_chanterelle",
            Self::Porcini => "porcini",
            Self::BlackTrumpet => "black_trumpet",
        }
    }

    /// Matches a marker name against the category labels.
    ///
    /// Comparison ignores case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|category| category.label().to_lowercase() == needle)
    }
}

/// Canonical marker record.
///
/// Serialized as `{ "key": .., "coordinate": { "latitude", "longitude" },
/// "name": string | null }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub key: MarkerKey,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub name: Option<String>,
}

impl Marker {
    /// Creates an unnamed marker with a generated key.
    pub fn new(coordinate: Coordinate) -> Self {
        Self::with_key(MarkerKey::generate(), coordinate)
    }

    /// Creates an unnamed marker with a caller-provided key.
    pub fn with_key(key: MarkerKey, coordinate: Coordinate) -> Self {
        Self {
            key,
            coordinate,
            name: None,
        }
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Name to render next to the pin.
    pub fn display_label(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_MARKER_LABEL)
    }

    /// Icon category derived from the name; `None` for unnamed or free text.
    pub fn category(&self) -> Option<MarkerCategory> {
        self.name.as_deref().and_then(MarkerCategory::from_name)
    }

    /// Validates record-level invariants.
    ///
    /// # Errors
    /// - `BlankKey` when the key is empty or whitespace.
    /// - `InvalidCoordinate` when the coordinate is out of range.
    /// - `BlankName` when a name is set but blank.
    pub fn validate(&self) -> Result<(), MarkerValidationError> {
        if self.key.is_blank() {
            return Err(MarkerValidationError::BlankKey);
        }
        self.coordinate.validate()?;
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(MarkerValidationError::BlankName(self.key.clone()));
            }
        }
        Ok(())
    }
}

/// Trims a user-entered marker name; returns `None` when nothing remains.
pub fn normalize_marker_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_marker_name, Coordinate, Marker, MarkerCategory, MarkerKey,
        MarkerValidationError, DEFAULT_MARKER_LABEL,
    };

    #[test]
    fn generated_keys_are_distinct() {
        assert_ne!(MarkerKey::generate(), MarkerKey::generate());
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_nan() {
        assert!(Coordinate::new(60.17, 24.94).validate().is_ok());
        assert!(Coordinate::new(91.0, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -180.5).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn unnamed_marker_uses_default_label() {
        let marker = Marker::new(Coordinate::new(60.17, 24.94));
        assert!(!marker.is_named());
        assert_eq!(marker.display_label(), DEFAULT_MARKER_LABEL);
        assert_eq!(marker.category(), None);
    }

    #[test]
    fn category_matches_case_insensitively() {
        assert_eq!(
            MarkerCategory::from_name("  kanttarelli "),
            Some(MarkerCategory::Chanterelle)
        );
        assert_eq!(MarkerCategory::from_name("Kärpässieni"), None);
        assert_eq!(MarkerCategory::from_name("   "), None);
    }

    #[test]
    fn validate_rejects_blank_name() {
        let mut marker = Marker::with_key("k1".into(), Coordinate::new(1.0, 2.0));
        marker.name = Some("  ".to_string());
        assert_eq!(
            marker.validate(),
            Err(MarkerValidationError::BlankName("k1".into()))
        );
    }

    #[test]
    fn normalize_trims_and_rejects_blank() {
        assert_eq!(
            normalize_marker_name("  Herkkutatti\n").as_deref(),
            Some("Herkkutatti")
        );
        assert_eq!(normalize_marker_name(" \t "), None);
    }
}
