//! Geolocation contract and initial map region resolution.
//!
//! # Responsibility
//! - Describe the host geolocation provider the core depends on.
//! - Turn a position fix into the region the map opens at.
//!
//! # Invariants
//! - Failures are returned as typed errors; the host shows an alert and
//!   leaves the map unrendered.

use crate::model::marker::Coordinate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default zoom span in degrees around the user's position.
pub const DEFAULT_REGION_DELTA: f64 = 0.01;

/// Outcome of a foreground location permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Geolocation failure surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    PermissionDenied,
    LocationUnavailable(String),
}

impl LocationError {
    /// Alert title for the host dialog.
    pub fn alert_title(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Location permission denied",
            Self::LocationUnavailable(_) => "Location error",
        }
    }

    /// Alert body for the host dialog.
    pub fn alert_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "The app needs location permission to work.",
            Self::LocationUnavailable(_) => "Fetching the current location failed.",
        }
    }
}

impl Display for LocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::LocationUnavailable(reason) => write!(f, "location unavailable: {reason}"),
        }
    }
}

impl Error for LocationError {}

/// Host geolocation provider.
pub trait GeolocationProvider {
    fn request_permission(&mut self) -> PermissionStatus;
    fn current_position(&mut self) -> Result<Coordinate, LocationError>;
}

/// Visible map area: center plus span in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center: Coordinate,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl MapRegion {
    /// Region centered on `center` with the default zoom span.
    pub fn around(center: Coordinate) -> Self {
        Self {
            center,
            latitude_delta: DEFAULT_REGION_DELTA,
            longitude_delta: DEFAULT_REGION_DELTA,
        }
    }
}

/// Resolves the region the map opens at on launch.
///
/// # Errors
/// - `PermissionDenied` when the prompt is refused; no position is requested.
/// - `LocationUnavailable` when the provider cannot produce a valid fix.
pub fn locate_initial_region(
    provider: &mut impl GeolocationProvider,
) -> Result<MapRegion, LocationError> {
    if provider.request_permission() == PermissionStatus::Denied {
        warn!("event=location_init module=location status=error error_code=permission_denied");
        return Err(LocationError::PermissionDenied);
    }
    let region = fetch_region(provider)?;
    info!("event=location_init module=location status=ok");
    Ok(region)
}

/// Region for the "return to current location" action.
///
/// Assumes permission was granted at launch and does not prompt again.
pub fn recenter_region(
    provider: &mut impl GeolocationProvider,
) -> Result<MapRegion, LocationError> {
    fetch_region(provider)
}

fn fetch_region(provider: &mut impl GeolocationProvider) -> Result<MapRegion, LocationError> {
    let position = provider.current_position().inspect_err(|err| {
        warn!(
            "event=location_fetch module=location status=error error={}",
            err
        );
    })?;
    position
        .validate()
        .map_err(|err| LocationError::LocationUnavailable(err.to_string()))?;
    Ok(MapRegion::around(position))
}
