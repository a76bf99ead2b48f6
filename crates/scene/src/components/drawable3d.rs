use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Shape3D {
    /// Edge length in meters.
    Cube { size: f64 },
    Sphere { radius: f64 },
}

/// A procedural object placed directly on the overlay, without an asset.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawable3D {
    #[serde(flatten)]
    pub shape: Shape3D,
    /// 0xRRGGBB.
    #[serde(default = "default_color")]
    pub color: u32,
}

fn default_color() -> u32 {
    0xaa_aa_aa
}

impl Drawable3D {
    pub fn cube(size: f64, color: u32) -> Self {
        Self {
            shape: Shape3D::Cube { size },
            color,
        }
    }

    pub fn sphere(radius: f64, color: u32) -> Self {
        Self {
            shape: Shape3D::Sphere { radius },
            color,
        }
    }

    /// Extent along each axis in meters.
    pub fn extent_m(&self) -> f64 {
        match self.shape {
            Shape3D::Cube { size } => size,
            Shape3D::Sphere { radius } => radius * 2.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        let e = self.extent_m();
        e.is_finite() && e > 0.0 && self.color <= 0xff_ff_ff
    }
}
