//! Primary importers: turn fetched bytes into a [`SceneHandle`].

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use scene::SceneHandle;

use crate::asset::{AssetFormat, AssetPayload};
use crate::{gltf_import, obj_import};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("glTF import failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("OBJ line {line}: {message}")]
    Obj { line: usize, message: String },
    #[error("MTL line {line}: {message}")]
    Material { line: usize, message: String },
    #[error("payload is not valid UTF-8 text")]
    NotUtf8,
    #[error("importer worker failed: {0}")]
    Worker(String),
}

/// `Ok(None)` means the importer finished without producing any content.
pub type ParseFuture = BoxFuture<'static, Result<Option<SceneHandle>, ParseError>>;

pub trait PrimaryParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn load(&self, format: AssetFormat, payload: AssetPayload) -> ParseFuture;
}

/// Synchronous import dispatched by format tag.
pub fn import(
    format: AssetFormat,
    payload: &AssetPayload,
) -> Result<Option<SceneHandle>, ParseError> {
    tracing::debug!(%format, bytes = payload.body.len(), "importing asset");
    match format {
        AssetFormat::Glb => gltf_import::import_glb(&payload.body),
        AssetFormat::Obj => obj_import::import_obj(&payload.body, payload.materials.as_deref()),
    }
}

/// Runs the built-in importers on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImporterParser;

impl PrimaryParser for ImporterParser {
    fn name(&self) -> &'static str {
        "importer"
    }

    fn load(&self, format: AssetFormat, payload: AssetPayload) -> ParseFuture {
        async move {
            tokio::task::spawn_blocking(move || import(format, &payload))
                .await
                .map_err(|e| ParseError::Worker(e.to_string()))?
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::{ImporterParser, ParseError, PrimaryParser, import};
    use crate::asset::{AssetFormat, AssetPayload};
    use crate::fixtures;

    #[tokio::test]
    async fn importer_parser_loads_glb_off_thread() {
        let payload = AssetPayload::new(fixtures::triangle_glb(None));
        let scene = ImporterParser
            .load(AssetFormat::Glb, payload)
            .await
            .expect("import")
            .expect("scene");
        assert_eq!(scene.stats.triangles, 1);
    }

    #[test]
    fn format_tag_is_trusted() {
        // OBJ text handed to the GLB importer is a rejection, not a sniffed retry.
        let payload = AssetPayload::new(fixtures::TRIANGLE_OBJ.as_bytes().to_vec());
        assert!(matches!(
            import(AssetFormat::Glb, &payload),
            Err(ParseError::Gltf(_))
        ));
    }

    #[test]
    fn empty_scene_is_not_an_error() {
        let payload = AssetPayload::new(fixtures::empty_scene_glb());
        assert!(matches!(import(AssetFormat::Glb, &payload), Ok(None)));
    }
}
