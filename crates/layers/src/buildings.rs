//! Extruded 3D buildings from the style's vector tiles, with hover highlighting.

use crate::map::{MapError, MapState, MapView};
use crate::style::{FeatureRef, FeatureState, LayerPosition, StyleLayer, StyleLayerKind};

pub const BUILDINGS_LAYER_ID: &str = "add-3d-buildings";
pub const BUILDINGS_SOURCE: &str = "composite";
pub const BUILDINGS_SOURCE_LAYER: &str = "building";
/// Extrusions are not drawn below this zoom.
pub const BUILDINGS_MINZOOM: f64 = 15.0;

/// Buildings flagged `extrude`, from the style's composite source.
pub fn extrusion_layer() -> StyleLayer {
    StyleLayer::new(BUILDINGS_LAYER_ID, StyleLayerKind::FillExtrusion)
        .from_source(BUILDINGS_SOURCE, BUILDINGS_SOURCE_LAYER)
        .with_filter("extrude", "true")
        .with_minzoom(BUILDINGS_MINZOOM)
}

fn building(id: u64) -> FeatureRef {
    FeatureRef {
        source: BUILDINGS_SOURCE.to_owned(),
        source_layer: BUILDINGS_SOURCE_LAYER.to_owned(),
        id,
    }
}

/// The extrusion layer plus the single hovered building, if hover is tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingsLayer {
    track_hover: bool,
    hovered: Option<u64>,
}

impl BuildingsLayer {
    /// Adds the extrusion layer under the first text labels.
    pub fn install(map: &mut MapView, track_hover: bool) -> Result<Self, MapError> {
        map.add_style_layer(extrusion_layer(), LayerPosition::BelowLabels)?;
        Ok(Self {
            track_hover,
            hovered: None,
        })
    }

    pub fn tracks_hover(&self) -> bool {
        self.track_hover
    }

    pub fn hovered(&self) -> Option<u64> {
        self.hovered
    }

    fn interactive(&self, map: &MapView) -> bool {
        self.track_hover
            && map.state() == MapState::Ready
            && map
                .style_layer(BUILDINGS_LAYER_ID)
                .is_some_and(|l| l.visible_at(map.config().zoom))
    }

    /// Pointer moved over building `id`. Returns whether anything changed.
    pub fn hover_enter(&mut self, map: &mut MapView, id: u64) -> bool {
        if !self.interactive(map) || self.hovered == Some(id) {
            return false;
        }
        if let Some(previous) = self.hovered.take() {
            map.set_feature_state(building(previous), FeatureState { hover: false });
        }
        map.set_feature_state(building(id), FeatureState { hover: true });
        self.hovered = Some(id);
        true
    }

    /// Pointer left the layer.
    pub fn hover_leave(&mut self, map: &mut MapView) -> bool {
        let Some(previous) = self.hovered.take() else {
            return false;
        };
        map.set_feature_state(building(previous), FeatureState { hover: false });
        true
    }
}
