//! Wavefront OBJ + MTL import.

use std::collections::BTreeMap;

use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use scene::{NodeKind, SceneHandle, SceneNode};

use crate::parser::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDef {
    pub name: String,
    pub diffuse: Option<[f64; 3]>,
}

fn floats<const N: usize>(mut it: std::str::SplitWhitespace<'_>) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for slot in &mut out {
        *slot = it.next()?.parse().ok()?;
    }
    Some(out)
}

fn text(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)
}

/// Reads `newmtl` blocks; only the diffuse colour is kept.
pub fn parse_mtl(bytes: &[u8]) -> Result<Vec<MaterialDef>, ParseError> {
    let mut defs: Vec<MaterialDef> = Vec::new();
    for (i, raw) in text(bytes)?.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        let mut it = line.split_whitespace();
        match it.next() {
            Some("newmtl") => {
                let name = it.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(ParseError::Material {
                        line: i + 1,
                        message: "newmtl without a name".into(),
                    });
                }
                defs.push(MaterialDef { name, diffuse: None });
            }
            Some("Kd") => {
                let Some(current) = defs.last_mut() else {
                    return Err(ParseError::Material {
                        line: i + 1,
                        message: "Kd before any newmtl".into(),
                    });
                };
                current.diffuse = Some(floats::<3>(it).ok_or_else(|| ParseError::Material {
                    line: i + 1,
                    message: "Kd needs three numbers".into(),
                })?);
            }
            _ => {}
        }
    }
    Ok(defs)
}

struct Group {
    name: String,
    faces: usize,
    materials: Vec<String>,
}

fn resolve_index(token: &str, count: usize, line: usize) -> Result<usize, ParseError> {
    let err = |message: String| ParseError::Obj { line, message };
    let position = token.split('/').next().unwrap_or_default();
    let raw: i64 = position
        .parse()
        .map_err(|_| err(format!("bad face index `{token}`")))?;
    let idx = match raw {
        0 => return Err(err("face index 0 is not valid".into())),
        r if r > 0 => (r - 1) as usize,
        r => {
            let back = r.unsigned_abs() as usize;
            count
                .checked_sub(back)
                .ok_or_else(|| err(format!("relative index {r} before first vertex")))?
        }
    };
    if idx >= count {
        return Err(err(format!("vertex {raw} out of range ({count} defined)")));
    }
    Ok(idx)
}

/// Imports OBJ text. `Ok(None)` when there is neither geometry nor faces.
pub fn import_obj(obj: &[u8], mtl: Option<&[u8]>) -> Result<Option<SceneHandle>, ParseError> {
    let defs = match mtl {
        Some(bytes) => parse_mtl(bytes)?,
        None => Vec::new(),
    };

    let mut positions: Vec<Vec3> = Vec::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut pending_name: Option<String> = None;
    let mut object_name: Option<String> = None;
    let mut current_material: Option<String> = None;
    let mut triangles = 0usize;
    let mut used: BTreeMap<String, usize> = BTreeMap::new();

    for (i, raw) in text(obj)?.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        let mut it = line.split_whitespace();
        let Some(keyword) = it.next() else { continue };
        match keyword {
            "v" => {
                let [x, y, z] = floats::<3>(it).ok_or_else(|| ParseError::Obj {
                    line: line_no,
                    message: "vertex needs three numbers".into(),
                })?;
                positions.push(Vec3::new(x, y, z));
            }
            "o" | "g" => {
                let name = it.collect::<Vec<_>>().join(" ");
                if keyword == "o" && object_name.is_none() && !name.is_empty() {
                    object_name = Some(name.clone());
                }
                pending_name = Some(name);
            }
            "usemtl" => {
                let name = it.collect::<Vec<_>>().join(" ");
                *used.entry(name.clone()).or_default() += 1;
                current_material = Some(name);
            }
            "f" => {
                let refs = it
                    .map(|tok| resolve_index(tok, positions.len(), line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                if refs.len() < 3 {
                    return Err(ParseError::Obj {
                        line: line_no,
                        message: format!("face has {} vertices", refs.len()),
                    });
                }
                if let Some(name) = pending_name.take() {
                    groups.push(Group {
                        name,
                        faces: 0,
                        materials: Vec::new(),
                    });
                } else if groups.is_empty() {
                    groups.push(Group {
                        name: "default".into(),
                        faces: 0,
                        materials: Vec::new(),
                    });
                }
                if let Some(group) = groups.last_mut() {
                    group.faces += 1;
                    if let Some(m) = &current_material {
                        if !group.materials.contains(m) {
                            group.materials.push(m.clone());
                        }
                    }
                }
                triangles += refs.len() - 2;
            }
            _ => {}
        }
    }

    if positions.is_empty() && groups.is_empty() {
        return Ok(None);
    }

    let mut scene = SceneHandle::new(object_name.clone());
    let root = scene.push_node(
        SceneNode::new(NodeKind::Group).named(object_name.unwrap_or_else(|| "obj".into())),
    );
    for group in &groups {
        let mut node = SceneNode::new(NodeKind::Mesh)
            .named(group.name.clone())
            .with_parent(root);
        node.user_data = Some(serde_json::json!({
            "faces": group.faces,
            "materials": group.materials,
        }));
        scene.push_node(node);
    }

    scene.bounds = Aabb3::from_points(positions.iter().copied());
    scene.stats.meshes = groups.len();
    scene.stats.primitives = groups.len();
    scene.stats.vertices = positions.len();
    scene.stats.triangles = triangles;
    scene.stats.materials = defs.len();

    for name in used.keys() {
        if !defs.iter().any(|d| &d.name == name) {
            scene
                .warnings
                .push(format!("material `{name}` is used but not defined"));
        }
    }

    Ok(Some(scene))
}
