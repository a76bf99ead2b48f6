use runtime::Frame;
use serde::{Deserialize, Serialize};

use crate::map::MapConfig;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderingMode {
    #[serde(rename = "2d")]
    Flat,
    #[default]
    #[serde(rename = "3d")]
    Depth,
}

/// A layer drawn by the application inside the map's render loop.
pub trait CustomLayer: Send {
    fn id(&self) -> &str;

    fn rendering_mode(&self) -> RenderingMode {
        RenderingMode::Depth
    }

    /// Called once, after the style has loaded.
    fn on_add(&mut self, map: &MapConfig);

    fn render(&mut self, frame: Frame);

    fn on_remove(&mut self) {}
}
