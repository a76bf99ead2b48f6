//! Small known-good assets for tests and the `probe sample` command.

use serde_json::{Value, json};

pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_BIN: u32 = 0x004E_4942;

/// Packs a JSON document and optional binary chunk into a GLB v2 container.
pub fn glb_container(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    let mut json_chunk = json.to_vec();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let bin_chunk = bin.map(|b| {
        let mut b = b.to_vec();
        while b.len() % 4 != 0 {
            b.push(0);
        }
        b
    });

    let mut total = 12 + 8 + json_chunk.len();
    if let Some(b) = &bin_chunk {
        total += 8 + b.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);
    if let Some(b) = bin_chunk {
        out.extend_from_slice(&(b.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&b);
    }
    out
}

const TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 5.0, 0.0]];

/// One-triangle GLB (10 m x 5 m). `extras` is attached to the scene and its root node.
pub fn triangle_glb(extras: Option<Value>) -> Vec<u8> {
    let mut bin = Vec::with_capacity(44);
    for v in TRIANGLE {
        for c in v {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    let byte_length = bin.len();

    let mut node = json!({ "name": "root", "mesh": 0 });
    let mut scene = json!({ "name": "fixture", "nodes": [0] });
    if let Some(extras) = extras {
        node["extras"] = extras.clone();
        scene["extras"] = extras;
    }

    let doc = json!({
        "asset": { "version": "2.0", "generator": "probe fixtures" },
        "scene": 0,
        "scenes": [scene],
        "nodes": [node],
        "meshes": [{
            "name": "triangle",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [10.0, 5.0, 0.0]
            },
            {
                "bufferView": 1,
                "componentType": 5123,
                "count": 3,
                "type": "SCALAR"
            }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{ "byteLength": byte_length }]
    });

    glb_container(doc.to_string().as_bytes(), Some(&bin))
}

/// Valid container whose only scene has no nodes.
pub fn empty_scene_glb() -> Vec<u8> {
    let doc = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [] }]
    });
    glb_container(doc.to_string().as_bytes(), None)
}

pub const TRIANGLE_OBJ: &str = "\
# single triangle
mtllib triangle.mtl
o panel
v 0 0 0
v 10 0 0
v 0 5 0
vn 0 0 1
usemtl brick
f 1//1 2//1 3//1
";

pub const TRIANGLE_MTL: &str = "\
newmtl brick
Kd 0.8 0.3 0.2
";
