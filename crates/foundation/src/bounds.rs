use crate::math::Vec3;

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb3 { min, max }
    }

    /// Smallest box containing every point, `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = Aabb3::new(first, first);
        for p in iter {
            bb.extend(p);
        }
        Some(bb)
    }

    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(self, other: Aabb3) -> Aabb3 {
        Aabb3::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Width, height, depth along x, y, z.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb3;
    use crate::math::Vec3;

    #[test]
    fn from_points_covers_all() {
        let bb = Aabb3::from_points([
            Vec3::new(1.0, 0.0, -2.0),
            Vec3::new(-1.0, 3.0, 0.5),
            Vec3::new(0.0, 1.0, 4.0),
        ])
        .expect("non-empty");
        assert_eq!(bb.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(bb.max, Vec3::new(1.0, 3.0, 4.0));
        assert_eq!(bb.size(), Vec3::new(2.0, 3.0, 6.0));
        assert_eq!(bb.center(), Vec3::new(0.0, 1.5, 1.0));
    }

    #[test]
    fn empty_points_have_no_box() {
        assert!(Aabb3::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn union_grows_both_sides() {
        let a = Aabb3::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb3::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
    }
}
