//! In-memory scene graph produced by the importers.

use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use serde::Serialize;
use serde_json::Value;

use crate::components::{Rotation, Transform};
use crate::placement::GeoLocation;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Mesh,
    Camera,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Group => "Group",
            NodeKind::Mesh => "Mesh",
            NodeKind::Camera => "Camera",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub transform: Transform,
    pub user_data: Option<Value>,
}

impl SceneNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            kind,
            parent: None,
            transform: Transform::identity(),
            user_data: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    pub meshes: usize,
    pub primitives: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
    pub animations: usize,
    pub cameras: usize,
}

/// Positioning facts carried by the asset itself.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EmbeddedPlacement {
    pub coordinates: Option<GeoLocation>,
    pub position: Vec3,
    pub rotation: Rotation,
    pub scale: Vec3,
}

impl Default for EmbeddedPlacement {
    fn default() -> Self {
        Self {
            coordinates: None,
            position: Vec3::ZERO,
            rotation: Rotation::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl EmbeddedPlacement {
    /// Usable geolocation; `[0, 0]` is treated as absent.
    pub fn geolocation(&self) -> Option<GeoLocation> {
        self.coordinates.filter(|c| !c.is_origin())
    }

    pub fn is_finite(&self) -> bool {
        let coords_ok = self
            .coordinates
            .is_none_or(|c| c.longitude.is_finite() && c.latitude.is_finite() && c.altitude.is_finite());
        coords_ok && self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

/// A parsed 3D asset: flattened node list plus whole-asset metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneHandle {
    pub name: Option<String>,
    pub kind: NodeKind,
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<usize>,
    pub bounds: Option<Aabb3>,
    pub embedded: EmbeddedPlacement,
    pub user_data: Option<Value>,
    pub stats: SceneStats,
    pub generator: Option<String>,
    /// Non-fatal importer notes (missing materials, skipped primitives, ...).
    pub warnings: Vec<String>,
}

impl Default for SceneHandle {
    fn default() -> Self {
        Self {
            name: None,
            kind: NodeKind::Group,
            nodes: Vec::new(),
            roots: Vec::new(),
            bounds: None,
            embedded: EmbeddedPlacement::default(),
            user_data: None,
            stats: SceneStats::default(),
            generator: None,
            warnings: Vec::new(),
        }
    }
}

impl SceneHandle {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Adds a node and returns its index. Parentless nodes become roots.
    pub fn push_node(&mut self, node: SceneNode) -> usize {
        let idx = self.nodes.len();
        if node.parent.is_none() {
            self.roots.push(idx);
        }
        self.nodes.push(node);
        idx
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children_of(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(idx))
            .map(|(i, _)| i)
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name.as_deref() == Some(name))
    }

    pub fn expand_bounds(&mut self, bb: Aabb3) {
        self.bounds = Some(match self.bounds {
            Some(existing) => existing.union(bb),
            None => bb,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{EmbeddedPlacement, NodeKind, SceneHandle, SceneNode};
    use crate::placement::GeoLocation;
    use foundation::bounds::Aabb3;
    use foundation::math::Vec3;

    #[test]
    fn parentless_nodes_become_roots() {
        let mut scene = SceneHandle::new(Some("cantina".into()));
        let root = scene.push_node(SceneNode::new(NodeKind::Group).named("root"));
        let child = scene.push_node(SceneNode::new(NodeKind::Mesh).with_parent(root));
        assert_eq!(scene.roots, vec![root]);
        assert_eq!(scene.children_of(root).collect::<Vec<_>>(), vec![child]);
        assert!(scene.find("root").is_some());
        assert!(!scene.is_empty());
    }

    #[test]
    fn origin_coordinates_are_not_a_geolocation() {
        let mut embedded = EmbeddedPlacement::default();
        assert_eq!(embedded.geolocation(), None);
        embedded.coordinates = Some(GeoLocation::new(0.0, 0.0, 0.0));
        assert_eq!(embedded.geolocation(), None);
        embedded.coordinates = Some(GeoLocation::new(26.1, 44.4, 0.0));
        assert!(embedded.geolocation().is_some());
    }

    #[test]
    fn expand_bounds_unions() {
        let mut scene = SceneHandle::default();
        scene.expand_bounds(Aabb3::new(Vec3::ZERO, Vec3::ONE));
        scene.expand_bounds(Aabb3::new(Vec3::splat(-2.0), Vec3::ZERO));
        let bb = scene.bounds.expect("bounds");
        assert_eq!(bb.min, Vec3::splat(-2.0));
        assert_eq!(bb.max, Vec3::ONE);
    }
}
