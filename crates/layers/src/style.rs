//! Declarative style layers and per-feature state.
//!
//! The map draws these itself; the application only decides which layers
//! exist, where they sit in the stack and which features carry state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::map::MapStyle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleLayerKind {
    Background,
    Fill,
    Line,
    /// `labelled` when the layout has a `text-field`.
    Symbol { labelled: bool },
    FillExtrusion,
    Raster,
}

/// `[key, value]` equality on a feature property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub key: String,
    pub equals: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,
    pub kind: StyleLayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropertyFilter>,
    #[serde(default)]
    pub minzoom: f64,
}

impl StyleLayer {
    pub fn new(id: impl Into<String>, kind: StyleLayerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            source: None,
            source_layer: None,
            filter: None,
            minzoom: 0.0,
        }
    }

    pub fn from_source(mut self, source: &str, source_layer: &str) -> Self {
        self.source = Some(source.to_owned());
        self.source_layer = Some(source_layer.to_owned());
        self
    }

    pub fn with_filter(mut self, key: &str, equals: &str) -> Self {
        self.filter = Some(PropertyFilter {
            key: key.to_owned(),
            equals: equals.to_owned(),
        });
        self
    }

    pub fn with_minzoom(mut self, minzoom: f64) -> Self {
        self.minzoom = minzoom;
        self
    }

    pub fn is_labelled_symbol(&self) -> bool {
        matches!(self.kind, StyleLayerKind::Symbol { labelled: true })
    }

    /// Whether the layer draws at `zoom`.
    pub fn visible_at(&self, zoom: f64) -> bool {
        zoom >= self.minzoom
    }
}

/// Where a new style layer goes in the stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayerPosition {
    #[default]
    Top,
    Before(String),
    /// Under the first symbol layer that draws text, or on top if none does.
    BelowLabels,
}

impl LayerPosition {
    /// Index in `stack` at which to insert.
    pub fn index_in(&self, stack: &[StyleLayer]) -> usize {
        let found = match self {
            LayerPosition::Top => None,
            LayerPosition::Before(id) => stack.iter().position(|l| &l.id == id),
            LayerPosition::BelowLabels => stack.iter().position(StyleLayer::is_labelled_symbol),
        };
        found.unwrap_or(stack.len())
    }
}

/// Identifies one feature of a vector source layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureRef {
    pub source: String,
    pub source_layer: String,
    pub id: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FeatureState {
    pub hover: bool,
}

pub type FeatureStates = BTreeMap<FeatureRef, FeatureState>;

impl MapStyle {
    /// Skeleton of the hosted style's layer stack, enough to position
    /// application layers against it.
    pub fn base_layers(&self) -> Vec<StyleLayer> {
        use StyleLayerKind::*;

        let raster = matches!(self, MapStyle::Satellite | MapStyle::SatelliteStreets);
        let mut layers = vec![StyleLayer::new("background", Background)];
        if raster {
            layers.push(StyleLayer::new("satellite", Raster).from_source("mapbox", "satellite"));
        } else {
            layers.push(StyleLayer::new("landuse", Fill).from_source("composite", "landuse"));
            layers.push(StyleLayer::new("water", Fill).from_source("composite", "water"));
            layers.push(
                StyleLayer::new("building", Fill)
                    .from_source("composite", "building")
                    .with_minzoom(15.0),
            );
        }
        if *self == MapStyle::Satellite {
            return layers;
        }
        layers.push(StyleLayer::new("road", Line).from_source("composite", "road"));
        layers.push(
            StyleLayer::new("road-shields", Symbol { labelled: false })
                .from_source("composite", "road"),
        );
        layers.push(
            StyleLayer::new("road-label", Symbol { labelled: true })
                .from_source("composite", "road"),
        );
        layers.push(
            StyleLayer::new("poi-label", Symbol { labelled: true })
                .from_source("composite", "poi_label"),
        );
        layers
    }
}
