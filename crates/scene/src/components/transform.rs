use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

/// Euler rotation in radians, applied in XYZ order.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Rotation {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_degrees(x: f64, y: f64, z: f64) -> Self {
        Self::new(x.to_radians(), y.to_radians(), z.to_radians())
    }

    /// Converts a unit quaternion `[x, y, z, w]` to XYZ Euler angles.
    pub fn from_quaternion(q: [f64; 4]) -> Self {
        let [x, y, z, w] = q;
        let m11 = 1.0 - 2.0 * (y * y + z * z);
        let m12 = 2.0 * (x * y - w * z);
        let m13 = 2.0 * (x * z + w * y);
        let m22 = 1.0 - 2.0 * (x * x + z * z);
        let m23 = 2.0 * (y * z - w * x);
        let m32 = 2.0 * (y * z + w * x);
        let m33 = 1.0 - 2.0 * (x * x + y * y);

        let ry = m13.clamp(-1.0, 1.0).asin();
        if m13.abs() < 0.999_999_9 {
            Self::new((-m23).atan2(m33), ry, (-m12).atan2(m11))
        } else {
            // Gimbal lock: fold the remaining rotation into x.
            Self::new(m32.atan2(m22), ry, 0.0)
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl std::ops::Add for Rotation {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// Either one factor for all axes or one per axis.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Uniform(f64),
    PerAxis([f64; 3]),
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

impl Scale {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Scale::Uniform(s) => Vec3::splat(s),
            Scale::PerAxis([x, y, z]) => Vec3::new(x, y, z),
        }
    }

    /// Finite and strictly positive on every axis.
    pub fn is_valid(self) -> bool {
        let v = self.to_vec3();
        v.is_finite() && v.x > 0.0 && v.y > 0.0 && v.z > 0.0
    }
}

/// Local translate / rotate / scale of a scene node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Rotation,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Rotation::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}
