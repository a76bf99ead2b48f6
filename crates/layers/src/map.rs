//! Headless map surface: configuration, styles and the custom-layer lifecycle.

use runtime::{Frame, FrameClock};
use serde::{Deserialize, Serialize};

use crate::layer::CustomLayer;
use crate::style::{FeatureRef, FeatureState, FeatureStates, LayerPosition, StyleLayer};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapStyle {
    #[default]
    Streets,
    Outdoors,
    Light,
    Dark,
    Satellite,
    SatelliteStreets,
}

impl MapStyle {
    pub const ALL: [MapStyle; 6] = [
        MapStyle::Streets,
        MapStyle::Outdoors,
        MapStyle::Light,
        MapStyle::Dark,
        MapStyle::Satellite,
        MapStyle::SatelliteStreets,
    ];

    pub fn url(&self) -> &'static str {
        match self {
            MapStyle::Streets => "mapbox://styles/mapbox/streets-v12",
            MapStyle::Outdoors => "mapbox://styles/mapbox/outdoors-v12",
            MapStyle::Light => "mapbox://styles/mapbox/light-v11",
            MapStyle::Dark => "mapbox://styles/mapbox/dark-v11",
            MapStyle::Satellite => "mapbox://styles/mapbox/satellite-v9",
            MapStyle::SatelliteStreets => "mapbox://styles/mapbox/satellite-streets-v12",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub style: MapStyle,
    /// `[longitude, latitude]` in degrees.
    pub center: [f64; 2],
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub antialias: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            style: MapStyle::Streets,
            center: [26.1025, 44.4268],
            zoom: 15.5,
            pitch: 45.0,
            bearing: -17.6,
            antialias: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapError {
    #[error("invalid map config: {0}")]
    InvalidConfig(String),
    #[error("layer `{0}` already exists")]
    DuplicateLayer(String),
    #[error("map has been removed")]
    Removed,
}

impl MapConfig {
    pub fn validate(&self) -> Result<(), MapError> {
        let [lng, lat] = self.center;
        if !(lng.is_finite() && (-180.0..=180.0).contains(&lng)) {
            return Err(MapError::InvalidConfig(format!("center longitude {lng}")));
        }
        if !(lat.is_finite() && (-90.0..=90.0).contains(&lat)) {
            return Err(MapError::InvalidConfig(format!("center latitude {lat}")));
        }
        if !(0.0..=24.0).contains(&self.zoom) {
            return Err(MapError::InvalidConfig(format!("zoom {}", self.zoom)));
        }
        if !(0.0..=85.0).contains(&self.pitch) {
            return Err(MapError::InvalidConfig(format!("pitch {}", self.pitch)));
        }
        if !self.bearing.is_finite() {
            return Err(MapError::InvalidConfig("bearing must be finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MapState {
    /// Style still loading; layers are queued.
    Loading,
    Ready,
    Removed,
}

pub struct MapView {
    config: MapConfig,
    state: MapState,
    layers: Vec<Box<dyn CustomLayer>>,
    style_layers: Vec<StyleLayer>,
    /// Style layers added before the style loaded.
    queued_style: Vec<(StyleLayer, LayerPosition)>,
    feature_states: FeatureStates,
    clock: FrameClock,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("layers", &self.layer_ids())
            .field("style_layers", &self.style_layers.len())
            .finish()
    }
}

impl MapView {
    pub fn new(config: MapConfig) -> Result<Self, MapError> {
        config.validate()?;
        tracing::debug!(style = config.style.url(), center = ?config.center, "map created");
        Ok(Self {
            config,
            state: MapState::Loading,
            layers: Vec::new(),
            style_layers: Vec::new(),
            queued_style: Vec::new(),
            feature_states: FeatureStates::new(),
            clock: FrameClock::new(),
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn state(&self) -> MapState {
        self.state
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id()).collect()
    }

    /// The style's layer stack, bottom first. Empty until the style loads.
    pub fn style_layers(&self) -> &[StyleLayer] {
        &self.style_layers
    }

    pub fn style_layer(&self, id: &str) -> Option<&StyleLayer> {
        self.style_layers.iter().find(|l| l.id == id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id() == id)
            || self.style_layers.iter().any(|l| l.id == id)
            || self.queued_style.iter().any(|(l, _)| l.id == id)
    }

    /// Inserts a style layer, or queues it until [`MapView::style_ready`].
    pub fn add_style_layer(
        &mut self,
        layer: StyleLayer,
        position: LayerPosition,
    ) -> Result<(), MapError> {
        if self.state == MapState::Removed {
            return Err(MapError::Removed);
        }
        if self.has_layer(&layer.id) {
            return Err(MapError::DuplicateLayer(layer.id));
        }
        if self.state == MapState::Ready {
            self.insert_style_layer(layer, &position);
        } else {
            self.queued_style.push((layer, position));
        }
        Ok(())
    }

    fn insert_style_layer(&mut self, layer: StyleLayer, position: &LayerPosition) {
        let at = position.index_in(&self.style_layers);
        tracing::debug!(layer = %layer.id, index = at, "style layer inserted");
        self.style_layers.insert(at, layer);
    }

    /// Replaces the state of one feature; a default state clears it.
    pub fn set_feature_state(&mut self, feature: FeatureRef, state: FeatureState) {
        if state == FeatureState::default() {
            self.feature_states.remove(&feature);
        } else {
            self.feature_states.insert(feature, state);
        }
    }

    pub fn feature_state(&self, feature: &FeatureRef) -> FeatureState {
        self.feature_states.get(feature).copied().unwrap_or_default()
    }

    pub fn feature_states(&self) -> &FeatureStates {
        &self.feature_states
    }

    pub fn frames_rendered(&self) -> u64 {
        self.clock.frames_rendered()
    }

    /// Recentres the camera, keeping zoom, pitch and bearing.
    pub fn fly_to(&mut self, center: [f64; 2]) -> Result<(), MapError> {
        let next = MapConfig {
            center,
            ..self.config
        };
        next.validate()?;
        tracing::debug!(?center, "camera moved");
        self.config = next;
        Ok(())
    }

    /// Queues the layer, or adds it right away when the style is ready.
    pub fn add_layer(&mut self, mut layer: Box<dyn CustomLayer>) -> Result<(), MapError> {
        if self.state == MapState::Removed {
            return Err(MapError::Removed);
        }
        if self.has_layer(layer.id()) {
            return Err(MapError::DuplicateLayer(layer.id().to_owned()));
        }
        if self.state == MapState::Ready {
            layer.on_add(&self.config);
        }
        tracing::debug!(layer = layer.id(), mode = ?layer.rendering_mode(), "layer added");
        self.layers.push(layer);
        Ok(())
    }

    /// Style finished loading: fires `on_add` for every queued layer. Repeats are ignored.
    pub fn style_ready(&mut self) {
        if self.state != MapState::Loading {
            return;
        }
        self.state = MapState::Ready;
        self.style_layers = self.config.style.base_layers();
        for (layer, position) in std::mem::take(&mut self.queued_style) {
            self.insert_style_layer(layer, &position);
        }
        tracing::debug!(layers = self.layers.len(), style_layers = self.style_layers.len(), "style loaded");
        for layer in &mut self.layers {
            layer.on_add(&self.config);
        }
    }

    /// Renders one frame; `None` until the style is ready or after removal.
    pub fn render_frame(&mut self) -> Option<Frame> {
        if self.state != MapState::Ready {
            return None;
        }
        let frame = self.clock.tick();
        for layer in &mut self.layers {
            layer.render(frame);
        }
        Some(frame)
    }

    pub fn remove(&mut self) {
        if self.state == MapState::Removed {
            return;
        }
        for layer in &mut self.layers {
            layer.on_remove();
        }
        self.layers.clear();
        self.style_layers.clear();
        self.queued_style.clear();
        self.feature_states.clear();
        self.state = MapState::Removed;
        tracing::debug!("map removed");
    }
}

impl Drop for MapView {
    fn drop(&mut self) {
        self.remove();
    }
}
