//! GLB import through the `gltf` crate.

use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use gltf::mesh::Mode;
use scene::components::{Rotation, Transform};
use scene::{GeoLocation, NodeKind, SceneHandle, SceneNode};
use serde_json::Value;

use crate::parser::ParseError;

type Mat4 = [[f64; 4]; 4];

const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

// Column-major, like glTF.
fn mat_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (c, col) in out.iter_mut().enumerate() {
        for (r, cell) in col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][r] * b[c][k]).sum();
        }
    }
    out
}

fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * p.x + m[1][0] * p.y + m[2][0] * p.z + m[3][0],
        m[0][1] * p.x + m[1][1] * p.y + m[2][1] * p.z + m[3][1],
        m[0][2] * p.x + m[1][2] * p.y + m[2][2] * p.z + m[3][2],
    )
}

fn to_f64(m: [[f32; 4]; 4]) -> Mat4 {
    m.map(|col| col.map(f64::from))
}

fn extras_value(raw: &gltf::json::Extras) -> Option<Value> {
    raw.as_ref()
        .and_then(|raw| serde_json::from_str::<Value>(raw.get()).ok())
        .filter(|v| !v.is_null())
}

fn node_transform(node: &gltf::Node<'_>) -> Transform {
    let (t, r, s) = node.transform().decomposed();
    Transform {
        position: Vec3::from_f32(t),
        rotation: Rotation::from_quaternion(r.map(f64::from)),
        scale: Vec3::from_f32(s),
    }
}

struct Walk<'a> {
    buffers: &'a [gltf::buffer::Data],
    scene: SceneHandle,
}

impl Walk<'_> {
    fn visit(&mut self, node: gltf::Node<'_>, parent: Option<usize>, parent_world: &Mat4) {
        let kind = if node.camera().is_some() {
            NodeKind::Camera
        } else if node.mesh().is_some() {
            NodeKind::Mesh
        } else {
            NodeKind::Group
        };

        let mut entry = SceneNode::new(kind).with_transform(node_transform(&node));
        entry.name = node.name().map(str::to_owned);
        entry.user_data = extras_value(node.extras());
        if let Some(p) = parent {
            entry = entry.with_parent(p);
        }
        let idx = self.scene.push_node(entry);

        let world = mat_mul(parent_world, &to_f64(node.transform().matrix()));
        if let Some(mesh) = node.mesh() {
            self.visit_mesh(&mesh, &world);
        }
        for child in node.children() {
            self.visit(child, Some(idx), &world);
        }
    }

    fn visit_mesh(&mut self, mesh: &gltf::Mesh<'_>, world: &Mat4) {
        for primitive in mesh.primitives() {
            self.scene.stats.primitives += 1;

            let bb = primitive.bounding_box();
            let local = Aabb3::new(Vec3::from_f32(bb.min), Vec3::from_f32(bb.max));
            let corners = local.corners().map(|c| transform_point(world, c));
            if let Some(world_bb) = Aabb3::from_points(corners) {
                self.scene.expand_bounds(world_bb);
            }

            let buffers = self.buffers;
            let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let vertices = reader.read_positions().map_or(0, |p| p.count());
            self.scene.stats.vertices += vertices;

            if primitive.mode() == Mode::Triangles {
                let corners = reader
                    .read_indices()
                    .map_or(vertices, |i| i.into_u32().count());
                self.scene.stats.triangles += corners / 3;
            } else {
                self.scene
                    .warnings
                    .push(format!("primitive mode {:?} skipped for triangle count", primitive.mode()));
            }
        }
    }
}

/// Imports a GLB container. `Ok(None)` when it holds no scene content.
pub fn import_glb(bytes: &[u8]) -> Result<Option<SceneHandle>, ParseError> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;

    let Some(gltf_scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        return Ok(None);
    };
    if gltf_scene.nodes().next().is_none() {
        return Ok(None);
    }

    let mut walk = Walk {
        buffers: &buffers,
        scene: SceneHandle::new(gltf_scene.name().map(str::to_owned)),
    };
    for root in gltf_scene.nodes() {
        walk.visit(root, None, &IDENTITY);
    }
    let mut scene = walk.scene;

    scene.stats.meshes = document.meshes().count();
    scene.stats.materials = document.materials().count();
    scene.stats.animations = document.animations().count();
    scene.stats.cameras = document.cameras().count();
    scene.generator = document.as_json().asset.generator.clone();

    let scene_extras = extras_value(gltf_scene.extras());
    let root_extras = scene
        .roots
        .first()
        .and_then(|&i| scene.nodes[i].user_data.clone());
    scene.user_data = scene_extras.or(root_extras);
    scene.embedded.coordinates = scene.user_data.as_ref().and_then(GeoLocation::from_user_data);

    if let &[root] = scene.roots.as_slice() {
        let t = scene.nodes[root].transform;
        scene.embedded.position = t.position;
        scene.embedded.rotation = t.rotation;
        scene.embedded.scale = t.scale;
    }

    Ok(Some(scene))
}

#[cfg(test)]
mod tests {
    use super::{IDENTITY, import_glb, mat_mul, transform_point};
    use crate::fixtures::{empty_scene_glb, triangle_glb};
    use crate::parser::ParseError;
    use foundation::math::Vec3;
    use scene::{GeoLocation, NodeKind};
    use serde_json::json;

    #[test]
    fn triangle_scene_metadata() {
        let scene = import_glb(&triangle_glb(None))
            .expect("import")
            .expect("content");
        assert_eq!(scene.name.as_deref(), Some("fixture"));
        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.nodes[0].kind, NodeKind::Mesh);
        assert_eq!(scene.stats.meshes, 1);
        assert_eq!(scene.stats.vertices, 3);
        assert_eq!(scene.stats.triangles, 1);
        assert_eq!(scene.generator.as_deref(), Some("probe fixtures"));

        let bounds = scene.bounds.expect("bounds");
        assert_eq!(bounds.size(), Vec3::new(10.0, 5.0, 0.0));
        assert_eq!(scene.embedded.geolocation(), None);
    }

    #[test]
    fn embedded_coordinates_from_extras() {
        let glb = triangle_glb(Some(json!({ "coordinates": [26.1, 44.4, 12.0] })));
        let scene = import_glb(&glb).expect("import").expect("content");
        assert_eq!(
            scene.embedded.geolocation(),
            Some(GeoLocation::new(26.1, 44.4, 12.0))
        );
    }

    #[test]
    fn origin_coordinates_count_as_absent() {
        let glb = triangle_glb(Some(json!({ "coordinates": [0.0, 0.0] })));
        let scene = import_glb(&glb).expect("import").expect("content");
        assert!(scene.embedded.coordinates.is_some());
        assert_eq!(scene.embedded.geolocation(), None);
    }

    #[test]
    fn empty_scene_yields_none() {
        assert!(import_glb(&empty_scene_glb()).expect("import").is_none());
    }

    #[test]
    fn truncated_container_is_rejected() {
        let glb = triangle_glb(None);
        let err = import_glb(&glb[..glb.len() - 8]).expect_err("truncated");
        assert!(matches!(err, ParseError::Gltf(_)));
    }

    #[test]
    fn matrices_compose_column_major() {
        let mut translate = IDENTITY;
        translate[3] = [5.0, 0.0, 0.0, 1.0];
        let mut scale = IDENTITY;
        scale[0][0] = 2.0;
        let m = mat_mul(&translate, &scale);
        assert_eq!(transform_point(&m, Vec3::new(1.0, 1.0, 0.0)), Vec3::new(7.0, 1.0, 0.0));
    }
}
