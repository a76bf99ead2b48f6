//! Probe configuration: loader timings, asset source and page variants.
//!
//! Everything has a built-in default reproducing the stock pages, so an
//! empty (or missing) TOML file is a valid configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use formats::{AssetRequest, AssetSpec};
use layers::MapConfig;
use layers::MapStyle;
use scene::components::{Drawable3D, Rotation, Scale};
use scene::{GeoLocation, Placement, PlacementPolicy};
use serde::{Deserialize, Serialize};
use streaming::{DirectoryFetcher, HttpFetcher, Locator, SourceFetcher};

pub const BUCHAREST: GeoLocation = GeoLocation {
    longitude: 26.1025,
    latitude: 44.4268,
    altitude: 0.0,
};

/// Where the Manhattan example model stands.
pub const MIDTOWN: GeoLocation = GeoLocation {
    longitude: -73.976799,
    latitude: 40.754145,
    altitude: 0.0,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Budget for the primary importer.
    pub parse_timeout_ms: u64,
    /// Pause before the structural probe after an empty import.
    pub diagnostic_delay_ms: u64,
    /// Run the structural probe automatically after parse failures.
    pub auto_diagnose: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            parse_timeout_ms: 10_000,
            diagnostic_delay_ms: 1_000,
            auto_diagnose: true,
        }
    }
}

impl LoaderSettings {
    pub fn parse_timeout(&self) -> Duration {
        Duration::from_millis(self.parse_timeout_ms)
    }

    pub fn diagnostic_delay(&self) -> Duration {
        Duration::from_millis(self.diagnostic_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Directory { root: PathBuf },
    Http { base_url: Option<String> },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Directory {
            root: PathBuf::from("public"),
        }
    }
}

impl SourceConfig {
    pub fn build(&self) -> Result<SourceFetcher, ConfigError> {
        match self {
            SourceConfig::Directory { root } => {
                Ok(SourceFetcher::Directory(DirectoryFetcher::new(root.clone())))
            }
            SourceConfig::Http { base_url } => {
                let base = match base_url.as_deref().map(Locator::parse).transpose() {
                    Ok(Some(Locator::Url(url))) => Some(url),
                    Ok(Some(Locator::Path(p))) => {
                        return Err(ConfigError::Invalid(format!(
                            "base_url `{p}` is not an absolute URL"
                        )));
                    }
                    Ok(None) => None,
                    Err(e) => return Err(ConfigError::Invalid(e.to_string())),
                };
                Ok(SourceFetcher::Http(HttpFetcher::new(base)))
            }
        }
    }
}

/// A procedural object shown on a primitives page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveSpec {
    pub name: String,
    #[serde(flatten)]
    pub drawable: Drawable3D,
    pub at: GeoLocation,
    /// Radians added per frame.
    #[serde(default)]
    pub spin: Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageContent {
    /// Map only.
    Basemap,
    Primitives {
        primitives: Vec<PrimitiveSpec>,
    },
    Model {
        asset: AssetSpec,
        placement: Placement,
        /// Move the camera to the model once it is placed.
        #[serde(default)]
        focus: bool,
    },
}

/// Whether a page shows extruded buildings, and whether they react to hover.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingsMode {
    #[default]
    Off,
    Static,
    Hover,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVariant {
    pub name: String,
    pub route: String,
    /// Overrides the top-level map settings for this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapConfig>,
    #[serde(default)]
    pub buildings: BuildingsMode,
    pub page: PageContent,
}

impl PageVariant {
    pub fn request(&self) -> Option<AssetRequest> {
        match &self.page {
            PageContent::Model {
                asset, placement, ..
            } => Some(AssetRequest::new(asset.clone(), *placement)),
            _ => None,
        }
    }

    pub fn map_config(&self, fallback: &MapConfig) -> MapConfig {
        self.map.unwrap_or(*fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub map: MapConfig,
    pub loader: LoaderSettings,
    pub source: SourceConfig,
    pub variants: Vec<PageVariant>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            loader: LoaderSettings::default(),
            source: SourceConfig::default(),
            variants: builtin_variants(),
        }
    }
}

fn locator(raw: &str) -> Locator {
    // Built-in paths are all non-empty.
    Locator::Path(raw.to_owned())
}

pub fn builtin_variants() -> Vec<PageVariant> {
    let close_up = MapConfig {
        zoom: 18.0,
        pitch: 60.0,
        bearing: 0.0,
        ..MapConfig::default()
    };
    vec![
        PageVariant {
            name: "home".into(),
            route: "/".into(),
            map: None,
            buildings: BuildingsMode::Hover,
            page: PageContent::Basemap,
        },
        PageVariant {
            name: "example".into(),
            route: "/example".into(),
            map: Some(MapConfig {
                style: MapStyle::Light,
                center: [-73.97627, 40.75155],
                zoom: 15.4,
                pitch: 64.9,
                bearing: 172.5,
                antialias: true,
            }),
            buildings: BuildingsMode::Off,
            page: PageContent::Model {
                asset: AssetSpec::glb(locator("/models/metlife-building.glb"))
                    .with_scale(Scale::PerAxis([3.2, 3.2, 2.7]))
                    .with_rotation(Rotation::from_degrees(90.0, -90.0, 0.0)),
                placement: Placement::new(MIDTOWN)
                    .with_policy(PlacementPolicy::Always)
                    .with_rotation(Rotation::from_degrees(0.0, 0.0, 241.0)),
                focus: false,
            },
        },
        PageVariant {
            name: "threebox".into(),
            route: "/threebox".into(),
            map: None,
            buildings: BuildingsMode::Static,
            page: PageContent::Primitives {
                primitives: vec![
                    PrimitiveSpec {
                        name: "cube".into(),
                        drawable: Drawable3D::cube(50.0, 0xff_00_00),
                        at: GeoLocation::new(26.1025, 44.4268, 100.0),
                        spin: Rotation::new(0.01, 0.01, 0.0),
                    },
                    PrimitiveSpec {
                        name: "sphere".into(),
                        drawable: Drawable3D::sphere(25.0, 0x00_ff_00),
                        at: GeoLocation::new(26.1035, 44.4268, 150.0),
                        spin: Rotation::new(0.02, 0.0, 0.01),
                    },
                ],
            },
        },
        PageVariant {
            name: "debug".into(),
            route: "/debug".into(),
            map: None,
            buildings: BuildingsMode::Off,
            page: PageContent::Model {
                asset: AssetSpec::glb(locator("/cantina.glb")),
                placement: Placement::new(BUCHAREST),
                focus: false,
            },
        },
        PageVariant {
            name: "local-glb".into(),
            route: "/local-glb".into(),
            map: Some(close_up),
            buildings: BuildingsMode::Off,
            page: PageContent::Model {
                asset: AssetSpec::glb(locator("/cantina.glb")),
                placement: Placement::new(BUCHAREST).with_policy(PlacementPolicy::Embedded),
                focus: true,
            },
        },
        PageVariant {
            name: "obj".into(),
            route: "/obj".into(),
            map: None,
            buildings: BuildingsMode::Off,
            page: PageContent::Model {
                asset: AssetSpec::obj(
                    locator("/models/buildings/cantinaUTCB.obj"),
                    Some(locator("/models/buildings/cantinaUTCB.mtl")),
                ),
                placement: Placement::new(BUCHAREST).with_policy(PlacementPolicy::Always),
                focus: false,
            },
        },
    ]
}

impl ProbeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ProbeConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.loader.parse_timeout_ms == 0 {
            return invalid("loader.parse_timeout_ms must be positive".into());
        }
        self.map
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut names = HashSet::new();
        let mut routes = HashSet::new();
        for v in &self.variants {
            if v.name.is_empty() {
                return invalid("variant name must not be empty".into());
            }
            if !v.route.starts_with('/') {
                return invalid(format!("route `{}` must start with '/'", v.route));
            }
            if !names.insert(v.name.as_str()) {
                return invalid(format!("duplicate variant `{}`", v.name));
            }
            if !routes.insert(v.route.as_str()) {
                return invalid(format!("duplicate route `{}`", v.route));
            }
            if let Some(map) = &v.map {
                map.validate()
                    .map_err(|e| ConfigError::Invalid(format!("{}: {e}", v.name)))?;
            }
            if let Some(request) = v.request() {
                request
                    .validate()
                    .map_err(|e| ConfigError::Invalid(format!("{}: {e}", v.name)))?;
            }
            if let PageContent::Primitives { primitives } = &v.page {
                for p in primitives {
                    if !p.drawable.is_valid() {
                        return invalid(format!("{}: primitive `{}` has no size", v.name, p.name));
                    }
                    p.at.validate()
                        .map_err(|e| ConfigError::Invalid(format!("{}: {e}", p.name)))?;
                }
            }
        }
        Ok(())
    }

    /// Looks a variant up by name or by route.
    pub fn variant(&self, key: &str) -> Option<&PageVariant> {
        self.variants
            .iter()
            .find(|v| v.name == key || v.route == key)
    }
}
