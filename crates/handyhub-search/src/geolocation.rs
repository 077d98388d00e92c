//! Resolving the search origin from manual entry or the device position.

use handyhub_core::{Coordinate, LocationSpec};
use thiserror::Error;

use crate::coordinate::{parse_coordinate, parse_text};

/// Failures reported by the device location source.
///
/// The display text is shown to the user as-is, so it carries the hint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("location permission was denied; enter your address or coordinates manually instead")]
    Denied,

    #[error("device location is unavailable ({reason}); enter your address or coordinates manually instead")]
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    #[error("could not read a location from \"{0}\"; use \"lat,lng\" coordinates")]
    UnparseableManualEntry(String),
}

/// Source of the device's current position.
pub trait LocationProvider {
    /// # Errors
    ///
    /// Returns [`GeolocationError`] when permission is refused or no
    /// position can be obtained.
    fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}

/// A [`LocationProvider`] with a fixed answer, used by the CLI and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceLocation {
    Fixed(Coordinate),
    Denied,
    Unsupported,
}

impl DeviceLocation {
    /// Setting value that stands for a refused location permission.
    pub const DENIED_SETTING: &'static str = "denied";

    /// Build from an optional raw setting such as `"-29.85,31.02"` or
    /// [`Self::DENIED_SETTING`] (case-insensitive).
    ///
    /// A missing setting means the platform has no location API; a setting
    /// that does not parse is treated the same way.
    #[must_use]
    pub fn from_setting(setting: Option<&str>) -> Self {
        let Some(raw) = setting else {
            return DeviceLocation::Unsupported;
        };
        if raw.trim().eq_ignore_ascii_case(Self::DENIED_SETTING) {
            return DeviceLocation::Denied;
        }
        if let Some(coord) = parse_coordinate(&LocationSpec::from(raw)) {
            DeviceLocation::Fixed(coord)
        } else {
            tracing::warn!(setting = raw, "device location setting is not a coordinate");
            DeviceLocation::Unsupported
        }
    }
}

impl LocationProvider for DeviceLocation {
    fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        match self {
            DeviceLocation::Fixed(c) => Ok(*c),
            DeviceLocation::Denied => Err(GeolocationError::Denied),
            DeviceLocation::Unsupported => Err(GeolocationError::Unavailable {
                reason: "no location API on this platform".to_string(),
            }),
        }
    }
}

/// Where the caller wants the search origin to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginRequest<'a> {
    /// Text-only search.
    None,
    /// A location typed by the user.
    Manual(&'a str),
    /// Ask the device.
    Device,
}

/// Resolve the search origin.
///
/// # Errors
///
/// Returns [`OriginError::UnparseableManualEntry`] for manual text that is
/// not a coordinate, and [`OriginError::Geolocation`] when the device
/// source fails. Neither is swallowed: the UI must tell the user.
pub fn resolve_origin(
    request: OriginRequest<'_>,
    provider: &dyn LocationProvider,
) -> Result<Option<Coordinate>, OriginError> {
    match request {
        OriginRequest::None => Ok(None),
        OriginRequest::Manual(text) => parse_text(text)
            .map(Some)
            .ok_or_else(|| OriginError::UnparseableManualEntry(text.trim().to_string())),
        OriginRequest::Device => {
            let position = provider
                .current_position()
                .inspect_err(|e| tracing::warn!(error = %e, "device geolocation failed"))?;
            Ok(Some(position))
        }
    }
}
