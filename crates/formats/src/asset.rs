use std::fmt;

use bytes::Bytes;
use scene::components::{Rotation, Scale};
use scene::{GeoLocation, ModelTransform, Placement, PlacementError, Units};
use serde::{Deserialize, Serialize};
use streaming::Locator;

/// Format tag supplied by the caller; payloads are never sniffed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    /// Binary glTF container.
    Glb,
    /// Wavefront OBJ text with an optional MTL material library.
    Obj,
}

impl AssetFormat {
    pub fn describe(&self) -> &'static str {
        match self {
            AssetFormat::Glb => "binary glTF (GLB)",
            AssetFormat::Obj => "Wavefront OBJ",
        }
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetFormat::Glb => f.write_str("glb"),
            AssetFormat::Obj => f.write_str("obj"),
        }
    }
}

/// One supported asset with the options that apply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetSpec {
    Glb {
        #[serde(alias = "obj")]
        url: Locator,
        #[serde(default)]
        scale: Scale,
        #[serde(default)]
        units: Units,
        #[serde(default)]
        rotation: Rotation,
    },
    Obj {
        #[serde(alias = "obj")]
        url: Locator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtl: Option<Locator>,
        #[serde(default)]
        scale: Scale,
        #[serde(default)]
        units: Units,
        #[serde(default)]
        rotation: Rotation,
    },
}

impl AssetSpec {
    pub fn glb(url: Locator) -> Self {
        AssetSpec::Glb {
            url,
            scale: Scale::default(),
            units: Units::default(),
            rotation: Rotation::ZERO,
        }
    }

    pub fn obj(url: Locator, mtl: Option<Locator>) -> Self {
        AssetSpec::Obj {
            url,
            mtl,
            scale: Scale::default(),
            units: Units::default(),
            rotation: Rotation::ZERO,
        }
    }

    pub fn with_scale(mut self, value: Scale) -> Self {
        match &mut self {
            AssetSpec::Glb { scale, .. } | AssetSpec::Obj { scale, .. } => *scale = value,
        }
        self
    }

    pub fn with_rotation(mut self, value: Rotation) -> Self {
        match &mut self {
            AssetSpec::Glb { rotation, .. } | AssetSpec::Obj { rotation, .. } => *rotation = value,
        }
        self
    }

    pub fn with_units(mut self, value: Units) -> Self {
        match &mut self {
            AssetSpec::Glb { units, .. } | AssetSpec::Obj { units, .. } => *units = value,
        }
        self
    }

    pub fn format(&self) -> AssetFormat {
        match self {
            AssetSpec::Glb { .. } => AssetFormat::Glb,
            AssetSpec::Obj { .. } => AssetFormat::Obj,
        }
    }

    pub fn locator(&self) -> &Locator {
        match self {
            AssetSpec::Glb { url, .. } | AssetSpec::Obj { url, .. } => url,
        }
    }

    pub fn material_library(&self) -> Option<&Locator> {
        match self {
            AssetSpec::Glb { .. } => None,
            AssetSpec::Obj { mtl, .. } => mtl.as_ref(),
        }
    }

    pub fn scale(&self) -> Scale {
        match self {
            AssetSpec::Glb { scale, .. } | AssetSpec::Obj { scale, .. } => *scale,
        }
    }

    pub fn units(&self) -> Units {
        match self {
            AssetSpec::Glb { units, .. } | AssetSpec::Obj { units, .. } => *units,
        }
    }

    pub fn rotation(&self) -> Rotation {
        match self {
            AssetSpec::Glb { rotation, .. } | AssetSpec::Obj { rotation, .. } => *rotation,
        }
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        if !self.scale().is_valid() {
            return Err(PlacementError::InvalidScale(self.scale()));
        }
        if !self.rotation().is_finite() {
            return Err(PlacementError::NonFinite("rotation"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid asset options: {0}")]
    Options(PlacementError),
    #[error("invalid placement: {0}")]
    Location(PlacementError),
}

/// Everything needed to load one asset onto the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub asset: AssetSpec,
    pub placement: Placement,
}

impl AssetRequest {
    pub fn new(asset: AssetSpec, placement: Placement) -> Self {
        Self { asset, placement }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        self.asset.validate().map_err(RequestError::Options)?;
        self.placement.validate().map_err(RequestError::Location)
    }

    /// Final transform once a location has been settled on.
    pub fn transform_at(&self, location: GeoLocation) -> ModelTransform {
        ModelTransform::at(location)
            .with_rotation(self.asset.rotation())
            .with_scale(self.asset.scale())
    }
}

/// Raw bytes handed to parsers.
#[derive(Debug, Clone, Default)]
pub struct AssetPayload {
    pub body: Bytes,
    /// Companion material library (OBJ only).
    pub materials: Option<Bytes>,
}

impl AssetPayload {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            materials: None,
        }
    }

    pub fn with_materials(mut self, materials: impl Into<Bytes>) -> Self {
        self.materials = Some(materials.into());
        self
    }
}
