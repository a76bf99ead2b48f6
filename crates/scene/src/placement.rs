//! Geographic placement of models on the map.

use foundation::math::{Ecef, Geodetic, MercatorCoord, geodetic_to_ecef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::components::{Rotation, Scale};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("scale must be finite and positive, got {0:?}")]
    InvalidScale(Scale),
}

/// Longitude / latitude in degrees, altitude in meters.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl GeoLocation {
    pub fn new(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
        }
    }

    /// Loaders report "no geolocation" as `[0, 0]`.
    pub fn is_origin(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        if !self.longitude.is_finite() {
            return Err(PlacementError::NonFinite("longitude"));
        }
        if !self.latitude.is_finite() {
            return Err(PlacementError::NonFinite("latitude"));
        }
        if !self.altitude.is_finite() {
            return Err(PlacementError::NonFinite("altitude"));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(PlacementError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PlacementError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.longitude, self.latitude, self.altitude]
    }

    pub fn to_geodetic(&self) -> Geodetic {
        Geodetic::from_degrees(self.longitude, self.latitude, self.altitude)
    }

    pub fn to_ecef(&self) -> Ecef {
        geodetic_to_ecef(self.to_geodetic())
    }

    pub fn to_mercator(&self) -> MercatorCoord {
        MercatorCoord::from_lng_lat(self.longitude, self.latitude, self.altitude)
    }

    /// Reads a geolocation embedded in asset user data.
    ///
    /// Accepts `{"coordinates": [lng, lat, alt?]}` or
    /// `{"longitude": .., "latitude": .., "altitude": ..}`.
    pub fn from_user_data(value: &Value) -> Option<Self> {
        if let Some(coords) = value.get("coordinates").and_then(Value::as_array) {
            let lng = coords.first()?.as_f64()?;
            let lat = coords.get(1)?.as_f64()?;
            let alt = coords.get(2).and_then(Value::as_f64).unwrap_or(0.0);
            return Some(Self::new(lng, lat, alt));
        }
        let lng = value.get("longitude")?.as_f64()?;
        let lat = value.get("latitude")?.as_f64()?;
        let alt = value.get("altitude").and_then(Value::as_f64).unwrap_or(0.0);
        Some(Self::new(lng, lat, alt))
    }
}

impl From<[f64; 3]> for GeoLocation {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<[f64; 2]> for GeoLocation {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1], 0.0)
    }
}

/// How model dimensions map onto the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Model units are meters, rescaled by latitude.
    #[default]
    Meters,
    /// Model units are taken as world units as-is.
    Scene,
}

/// Where and how a model is drawn: geolocation, rotation and scale.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTransform {
    #[serde(flatten)]
    pub location: GeoLocation,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub scale: Scale,
}

impl ModelTransform {
    pub fn at(location: GeoLocation) -> Self {
        Self {
            location,
            rotation: Rotation::ZERO,
            scale: Scale::default(),
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        self.location.validate()?;
        if !self.rotation.is_finite() {
            return Err(PlacementError::NonFinite("rotation"));
        }
        if !self.scale.is_valid() {
            return Err(PlacementError::InvalidScale(self.scale));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementPolicy {
    /// Keep an embedded geolocation, otherwise use the caller's location.
    #[default]
    DefaultIfMissing,
    /// Always move the model to the caller's location.
    Always,
    /// Never reposition.
    Embedded,
}

/// Caller-supplied default location plus the policy for applying it.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub location: GeoLocation,
    #[serde(default)]
    pub policy: PlacementPolicy,
    /// Orientation given to the model once placed, replacing its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ResolvedLocation {
    Embedded(GeoLocation),
    Assigned(GeoLocation),
    /// Policy forbids repositioning and the asset carries nothing usable.
    Skipped,
}

impl ResolvedLocation {
    pub fn location(&self) -> Option<GeoLocation> {
        match self {
            ResolvedLocation::Embedded(loc) | ResolvedLocation::Assigned(loc) => Some(*loc),
            ResolvedLocation::Skipped => None,
        }
    }
}

impl Placement {
    pub fn new(location: GeoLocation) -> Self {
        Self {
            location,
            policy: PlacementPolicy::default(),
            rotation: None,
        }
    }

    pub fn with_policy(mut self, policy: PlacementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        self.location.validate()?;
        if self.rotation.is_some_and(|r| !r.is_finite()) {
            return Err(PlacementError::NonFinite("placement rotation"));
        }
        Ok(())
    }

    /// `embedded` is the asset's own geolocation; origin counts as absent.
    pub fn resolve(&self, embedded: Option<GeoLocation>) -> ResolvedLocation {
        let embedded = embedded.filter(|loc| !loc.is_origin());
        match (self.policy, embedded) {
            (PlacementPolicy::Always, _) => ResolvedLocation::Assigned(self.location),
            (_, Some(loc)) => ResolvedLocation::Embedded(loc),
            (PlacementPolicy::DefaultIfMissing, None) => ResolvedLocation::Assigned(self.location),
            (PlacementPolicy::Embedded, None) => ResolvedLocation::Skipped,
        }
    }
}
