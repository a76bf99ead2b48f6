//! Secondary structural probe: reads the raw container without building a scene.
//!
//! Used after the primary importer fails or returns nothing, to tell a
//! malformed payload apart from one that is structurally sound.

use serde::Serialize;
use serde_json::Value;

use crate::asset::{AssetFormat, AssetPayload};
use crate::fixtures::{CHUNK_BIN, CHUNK_JSON, GLB_MAGIC};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProbeError {
    #[error("payload is {len} bytes, shorter than a GLB header")]
    TooShort { len: usize },
    #[error("magic {found:#010x} is not a GLB container")]
    NotGlb { found: u32 },
    #[error("unsupported GLB version {0}")]
    UnsupportedVersion(u32),
    #[error("header declares {declared} bytes but only {actual} arrived")]
    Truncated { declared: usize, actual: usize },
    #[error("chunk {index} at offset {offset} runs past the container ({length} bytes)")]
    ChunkOutOfBounds {
        index: usize,
        offset: usize,
        length: usize,
    },
    #[error("first chunk is not JSON")]
    MissingJson,
    #[error("JSON chunk is unreadable: {0}")]
    Json(String),
    #[error("bufferView {index} ends at byte {end}, buffer holds {available}")]
    BufferViewOutOfBounds {
        index: usize,
        end: u64,
        available: u64,
    },
    #[error("buffer {index} declares {declared} bytes, BIN chunk holds {available}")]
    BufferOutOfBounds {
        index: usize,
        declared: u64,
        available: u64,
    },
    #[error("buffer 0 has no uri but the container has no BIN chunk")]
    MissingBin,
    #[error("glTF validation failed: {0}")]
    Invalid(String),
    #[error("OBJ line {line}: {message}")]
    Obj { line: usize, message: String },
    #[error("payload is not valid UTF-8 text")]
    NotUtf8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlbReport {
    pub byte_length: usize,
    pub json_length: usize,
    pub bin_length: Option<usize>,
    pub version: Option<String>,
    pub generator: Option<String>,
    pub extensions_used: Vec<String>,
    pub scenes: usize,
    pub nodes: usize,
    pub meshes: usize,
    pub accessors: usize,
    pub buffer_views: usize,
    pub buffers: usize,
    pub materials: usize,
    pub images: usize,
    pub animations: usize,
    /// Extras found on scenes and nodes, in document order.
    pub extras: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjReport {
    pub lines: usize,
    pub vertices: usize,
    pub normals: usize,
    pub texcoords: usize,
    pub faces: usize,
    pub groups: usize,
    pub material_libs: Vec<String>,
    pub materials_used: Vec<String>,
    pub material_defs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum StructureReport {
    Glb(GlbReport),
    Obj(ObjReport),
}

impl StructureReport {
    pub fn summary_lines(&self) -> Vec<String> {
        match self {
            StructureReport::Glb(r) => {
                let mut out = vec![
                    format!(
                        "GLB container {} bytes (JSON {}, BIN {})",
                        r.byte_length,
                        r.json_length,
                        r.bin_length.map_or_else(|| "none".into(), |n| n.to_string())
                    ),
                    format!(
                        "glTF {} from {}",
                        r.version.as_deref().unwrap_or("?"),
                        r.generator.as_deref().unwrap_or("unknown generator")
                    ),
                    format!(
                        "{} scenes, {} nodes, {} meshes, {} accessors, {} materials, {} animations",
                        r.scenes, r.nodes, r.meshes, r.accessors, r.materials, r.animations
                    ),
                ];
                if !r.extensions_used.is_empty() {
                    out.push(format!("extensions: {}", r.extensions_used.join(", ")));
                }
                for extras in &r.extras {
                    out.push(format!("extras: {extras}"));
                }
                out
            }
            StructureReport::Obj(r) => {
                let mut out = vec![format!(
                    "OBJ {} lines: {} vertices, {} normals, {} texcoords, {} faces, {} groups",
                    r.lines, r.vertices, r.normals, r.texcoords, r.faces, r.groups
                )];
                if !r.material_libs.is_empty() {
                    out.push(format!("mtllib: {}", r.material_libs.join(", ")));
                }
                match r.material_defs {
                    Some(n) => out.push(format!(
                        "{n} materials defined, {} referenced",
                        r.materials_used.len()
                    )),
                    None => out.push(format!(
                        "no material library supplied, {} referenced",
                        r.materials_used.len()
                    )),
                }
                out
            }
        }
    }
}

pub trait StructuralProbe: Send + Sync {
    fn name(&self) -> &'static str;

    fn inspect(
        &self,
        format: AssetFormat,
        payload: &AssetPayload,
    ) -> Result<StructureReport, ProbeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RawStructureProbe;

impl StructuralProbe for RawStructureProbe {
    fn name(&self) -> &'static str {
        "raw-structure"
    }

    fn inspect(
        &self,
        format: AssetFormat,
        payload: &AssetPayload,
    ) -> Result<StructureReport, ProbeError> {
        match format {
            AssetFormat::Glb => inspect_glb(&payload.body).map(StructureReport::Glb),
            AssetFormat::Obj => {
                inspect_obj(&payload.body, payload.materials.as_deref()).map(StructureReport::Obj)
            }
        }
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn array_len(doc: &Value, key: &str) -> usize {
    doc.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

fn collect_extras(doc: &Value, key: &str, out: &mut Vec<Value>) {
    let Some(items) = doc.get(key).and_then(Value::as_array) else {
        return;
    };
    out.extend(items.iter().filter_map(|item| item.get("extras")).cloned());
}

pub fn inspect_glb(bytes: &[u8]) -> Result<GlbReport, ProbeError> {
    if bytes.len() < 12 {
        return Err(ProbeError::TooShort { len: bytes.len() });
    }
    let magic = read_u32(bytes, 0);
    if magic != GLB_MAGIC {
        return Err(ProbeError::NotGlb { found: magic });
    }
    let version = read_u32(bytes, 4);
    if version != 2 {
        return Err(ProbeError::UnsupportedVersion(version));
    }
    let declared = read_u32(bytes, 8) as usize;
    if declared > bytes.len() {
        return Err(ProbeError::Truncated {
            declared,
            actual: bytes.len(),
        });
    }

    let mut chunks: Vec<(u32, &[u8])> = Vec::new();
    let mut offset = 12;
    while offset < declared {
        let index = chunks.len();
        if offset + 8 > declared {
            return Err(ProbeError::ChunkOutOfBounds {
                index,
                offset,
                length: declared,
            });
        }
        let len = read_u32(bytes, offset) as usize;
        let kind = read_u32(bytes, offset + 4);
        let start = offset + 8;
        let end = start.checked_add(len).filter(|&e| e <= declared).ok_or(
            ProbeError::ChunkOutOfBounds {
                index,
                offset,
                length: declared,
            },
        )?;
        chunks.push((kind, &bytes[start..end]));
        offset = end;
    }

    let json = match chunks.first() {
        Some((CHUNK_JSON, data)) => *data,
        _ => return Err(ProbeError::MissingJson),
    };
    let bin = chunks
        .iter()
        .skip(1)
        .find(|(kind, _)| *kind == CHUNK_BIN)
        .map(|(_, data)| *data);

    let doc: Value = serde_json::from_slice(json).map_err(|e| ProbeError::Json(e.to_string()))?;

    let buffers = doc.get("buffers").and_then(Value::as_array).cloned().unwrap_or_default();
    let mut capacity: Vec<u64> = Vec::with_capacity(buffers.len());
    for (index, buffer) in buffers.iter().enumerate() {
        let declared = buffer.get("byteLength").and_then(Value::as_u64).unwrap_or(0);
        if index == 0 && buffer.get("uri").is_none() {
            let available = bin.ok_or(ProbeError::MissingBin)?.len() as u64;
            if declared > available {
                return Err(ProbeError::BufferOutOfBounds {
                    index,
                    declared,
                    available,
                });
            }
        }
        capacity.push(declared);
    }

    if let Some(views) = doc.get("bufferViews").and_then(Value::as_array) {
        for (index, view) in views.iter().enumerate() {
            let buffer = view.get("buffer").and_then(Value::as_u64).unwrap_or(0) as usize;
            let start = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0);
            let len = view.get("byteLength").and_then(Value::as_u64).unwrap_or(0);
            let available = capacity.get(buffer).copied().unwrap_or(0);
            let end = start.saturating_add(len);
            if end > available {
                return Err(ProbeError::BufferViewOutOfBounds {
                    index,
                    end,
                    available,
                });
            }
        }
    }

    // Structure looks sound; let the reference validator have the last word.
    gltf::Gltf::from_slice(&bytes[..declared]).map_err(|e| ProbeError::Invalid(e.to_string()))?;

    let asset = doc.get("asset");
    let text = |key: &str| {
        asset
            .and_then(|a| a.get(key))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };
    let mut extras = Vec::new();
    collect_extras(&doc, "scenes", &mut extras);
    collect_extras(&doc, "nodes", &mut extras);

    Ok(GlbReport {
        byte_length: declared,
        json_length: json.len(),
        bin_length: bin.map(<[u8]>::len),
        version: text("version"),
        generator: text("generator"),
        extensions_used: doc
            .get("extensionsUsed")
            .and_then(Value::as_array)
            .map(|v| v.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default(),
        scenes: array_len(&doc, "scenes"),
        nodes: array_len(&doc, "nodes"),
        meshes: array_len(&doc, "meshes"),
        accessors: array_len(&doc, "accessors"),
        buffer_views: array_len(&doc, "bufferViews"),
        buffers: buffers.len(),
        materials: array_len(&doc, "materials"),
        images: array_len(&doc, "images"),
        animations: array_len(&doc, "animations"),
        extras,
    })
}

pub fn inspect_obj(obj: &[u8], mtl: Option<&[u8]>) -> Result<ObjReport, ProbeError> {
    let text = std::str::from_utf8(obj).map_err(|_| ProbeError::NotUtf8)?;
    let mut report = ObjReport::default();

    for (i, raw) in text.lines().enumerate() {
        report.lines += 1;
        let mut it = raw.split('#').next().unwrap_or_default().split_whitespace();
        match it.next() {
            Some("v") => {
                let numeric = it.take(3).filter(|t| t.parse::<f64>().is_ok()).count();
                if numeric < 3 {
                    return Err(ProbeError::Obj {
                        line: i + 1,
                        message: "vertex needs three numbers".into(),
                    });
                }
                report.vertices += 1;
            }
            Some("vn") => report.normals += 1,
            Some("vt") => report.texcoords += 1,
            Some("f") => report.faces += 1,
            Some("o" | "g") => report.groups += 1,
            Some("mtllib") => report.material_libs.extend(it.map(str::to_owned)),
            Some("usemtl") => {
                let name = it.collect::<Vec<_>>().join(" ");
                if !report.materials_used.contains(&name) {
                    report.materials_used.push(name);
                }
            }
            _ => {}
        }
    }

    if let Some(mtl) = mtl {
        let text = std::str::from_utf8(mtl).map_err(|_| ProbeError::NotUtf8)?;
        report.material_defs = Some(
            text.lines()
                .filter(|l| l.trim_start().starts_with("newmtl"))
                .count(),
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{
        ProbeError, RawStructureProbe, StructuralProbe, StructureReport, inspect_glb, inspect_obj,
    };
    use crate::asset::{AssetFormat, AssetPayload};
    use crate::fixtures::{TRIANGLE_MTL, TRIANGLE_OBJ, glb_container, triangle_glb};
    use serde_json::json;

    #[test]
    fn sound_container_report() {
        let report = inspect_glb(&triangle_glb(Some(json!({"coordinates": [26.1, 44.4]}))))
            .expect("report");
        assert_eq!(report.meshes, 1);
        assert_eq!(report.nodes, 1);
        assert_eq!(report.bin_length, Some(44));
        assert_eq!(report.generator.as_deref(), Some("probe fixtures"));
        assert_eq!(report.extras.len(), 2);
    }

    #[test]
    fn truncated_download() {
        let glb = triangle_glb(None);
        let err = inspect_glb(&glb[..glb.len() / 2]).expect_err("truncated");
        assert!(matches!(err, ProbeError::Truncated { .. }));
    }

    #[test]
    fn html_error_page_is_not_glb() {
        let err = inspect_glb(b"<!doctype html><html></html>").expect_err("html");
        assert!(matches!(err, ProbeError::NotGlb { .. }));
        assert!(matches!(
            inspect_glb(b"glTF"),
            Err(ProbeError::TooShort { len: 4 })
        ));
    }

    #[test]
    fn buffer_view_past_bin_chunk() {
        let doc = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 8 }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 4, "byteLength": 16 }]
        });
        let glb = glb_container(doc.to_string().as_bytes(), Some(&[0u8; 8]));
        match inspect_glb(&glb) {
            Err(ProbeError::BufferViewOutOfBounds { index, end, available }) => {
                assert_eq!((index, end, available), (0, 20, 8));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn embedded_buffer_without_bin() {
        let doc = json!({ "asset": { "version": "2.0" }, "buffers": [{ "byteLength": 8 }] });
        let glb = glb_container(doc.to_string().as_bytes(), None);
        assert_eq!(inspect_glb(&glb), Err(ProbeError::MissingBin));
    }

    #[test]
    fn broken_json_chunk() {
        let glb = glb_container(b"{\"asset\":", None);
        assert!(matches!(inspect_glb(&glb), Err(ProbeError::Json(_))));
    }

    #[test]
    fn obj_tally() {
        let report = inspect_obj(TRIANGLE_OBJ.as_bytes(), Some(TRIANGLE_MTL.as_bytes()))
            .expect("report");
        assert_eq!(report.vertices, 3);
        assert_eq!(report.normals, 1);
        assert_eq!(report.faces, 1);
        assert_eq!(report.groups, 1);
        assert_eq!(report.material_libs, vec!["triangle.mtl".to_string()]);
        assert_eq!(report.materials_used, vec!["brick".to_string()]);
        assert_eq!(report.material_defs, Some(1));
    }

    #[test]
    fn probe_dispatches_on_format_and_summarises() {
        let payload = AssetPayload::new(TRIANGLE_OBJ.as_bytes().to_vec());
        let report = RawStructureProbe
            .inspect(AssetFormat::Obj, &payload)
            .expect("report");
        assert!(matches!(report, StructureReport::Obj(_)));
        let lines = report.summary_lines();
        assert!(lines[0].starts_with("OBJ 9 lines: 3 vertices"));
        assert!(lines.iter().any(|l| l.contains("no material library")));
    }
}
