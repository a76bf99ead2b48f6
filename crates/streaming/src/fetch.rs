use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::Url;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::debug;

use crate::locator::Locator;

/// Raw outcome of a retrieval, successful or not.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub locator: Locator,
    pub status: u16,
    pub reason: String,
    /// As advertised by the source, which may disagree with `body.len()`.
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedAsset {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn byte_len(&self) -> usize {
        self.body.len()
    }

    /// BLAKE3 digest of the body, hex encoded.
    pub fn digest_hex(&self) -> String {
        blake3::hash(&self.body).to_hex().to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure, message kept verbatim.
    #[error("{0}")]
    Network(String),
    #[error("failed to read {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot resolve `{locator}`: {reason}")]
    Unresolvable {
        locator: String,
        reason: &'static str,
    },
}

pub type FetchFuture<'a> = BoxFuture<'a, Result<FetchedAsset, FetchError>>;

/// Retrieves raw asset bytes. Implementations never retry.
pub trait AssetFetcher: Send + Sync {
    fn fetch<'a>(&'a self, locator: &'a Locator) -> FetchFuture<'a>;
}

/// Content type for a file served from disk.
///
/// 3D formats are mapped explicitly; everything else goes through
/// `mime_guess`.
pub fn content_type_for(path: &Path) -> Option<String> {
    let ext = path.extension().and_then(|e| e.to_str())?.to_ascii_lowercase();
    let explicit = match ext.as_str() {
        "glb" => Some("model/gltf-binary"),
        "gltf" => Some("model/gltf+json"),
        "obj" => Some("model/obj"),
        "mtl" => Some("model/mtl"),
        _ => None,
    };
    explicit
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(path).first_raw().map(str::to_string))
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    pub fn new(base_url: Option<Url>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    pub fn resolve(&self, locator: &Locator) -> Result<Url, FetchError> {
        match locator {
            Locator::Url(url) => Ok(url.clone()),
            Locator::Path(path) => {
                let base = self.base_url.as_ref().ok_or_else(|| FetchError::Unresolvable {
                    locator: path.clone(),
                    reason: "relative locator needs a base URL",
                })?;
                base.join(path).map_err(|_| FetchError::Unresolvable {
                    locator: path.clone(),
                    reason: "not a valid URL path",
                })
            }
        }
    }

    async fn fetch_url(&self, locator: &Locator) -> Result<FetchedAsset, FetchError> {
        let url = self.resolve(locator)?;
        debug!(%url, "fetching asset over http");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        let content_length = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(FetchedAsset {
            locator: locator.clone(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            content_length,
            content_type,
            body,
        })
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, locator: &'a Locator) -> FetchFuture<'a> {
        self.fetch_url(locator).boxed()
    }
}

/// Serves locators from a local directory the way a static file server
/// would: a missing file answers 404 rather than failing.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, locator: &Locator) -> Result<PathBuf, FetchError> {
        match locator {
            Locator::Path(path) => {
                let relative = Path::new(path.trim_start_matches('/'));
                let escapes = relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if escapes {
                    return Err(FetchError::Unresolvable {
                        locator: path.clone(),
                        reason: "path escapes the asset root",
                    });
                }
                Ok(self.root.join(relative))
            }
            Locator::Url(url) if url.scheme() == "file" => {
                url.to_file_path().map_err(|_| FetchError::Unresolvable {
                    locator: url.to_string(),
                    reason: "not a local file URL",
                })
            }
            Locator::Url(url) => Err(FetchError::Unresolvable {
                locator: url.to_string(),
                reason: "directory source only serves paths",
            }),
        }
    }

    async fn fetch_path(&self, locator: &Locator) -> Result<FetchedAsset, FetchError> {
        let path = self.resolve(locator)?;
        debug!(path = %path.display(), "reading asset from disk");

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(FetchedAsset {
                locator: locator.clone(),
                status: 200,
                reason: "OK".to_string(),
                content_length: Some(data.len() as u64),
                content_type: content_type_for(&path),
                body: Bytes::from(data),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FetchedAsset {
                locator: locator.clone(),
                status: 404,
                reason: "Not Found".to_string(),
                content_length: None,
                content_type: None,
                body: Bytes::new(),
            }),
            Err(source) => Err(FetchError::Storage { path, source }),
        }
    }
}

impl AssetFetcher for DirectoryFetcher {
    fn fetch<'a>(&'a self, locator: &'a Locator) -> FetchFuture<'a> {
        self.fetch_path(locator).boxed()
    }
}

/// Fetcher picked from configuration.
#[derive(Debug, Clone)]
pub enum SourceFetcher {
    Http(HttpFetcher),
    Directory(DirectoryFetcher),
}

impl AssetFetcher for SourceFetcher {
    fn fetch<'a>(&'a self, locator: &'a Locator) -> FetchFuture<'a> {
        match self {
            SourceFetcher::Http(f) => f.fetch(locator),
            SourceFetcher::Directory(f) => f.fetch(locator),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::Router;
    use axum::http::header;
    use axum::routing::get;
    use reqwest::Url;

    use super::{AssetFetcher, DirectoryFetcher, FetchError, HttpFetcher, content_type_for};
    use crate::locator::Locator;

    async fn spawn_server() -> Url {
        let app = Router::new().route(
            "/cantina.glb",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "model/gltf-binary")],
                    vec![7u8; 1000],
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Url::parse(&format!("http://{addr}/")).expect("base url")
    }

    #[test]
    fn content_types_for_model_files() {
        assert_eq!(
            content_type_for(Path::new("a/cantina.glb")).as_deref(),
            Some("model/gltf-binary")
        );
        assert_eq!(content_type_for(Path::new("b.OBJ")).as_deref(), Some("model/obj"));
        assert_eq!(content_type_for(Path::new("c.json")).as_deref(), Some("application/json"));
        assert_eq!(content_type_for(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn directory_fetch_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("model.glb"), vec![1u8; 1000]).expect("write");
        let fetcher = DirectoryFetcher::new(dir.path());

        let asset = fetcher
            .fetch(&Locator::parse("/model.glb").expect("locator"))
            .await
            .expect("fetch");
        assert!(asset.is_success());
        assert_eq!(asset.byte_len(), 1000);
        assert_eq!(asset.content_length, Some(1000));
        assert_eq!(asset.content_type.as_deref(), Some("model/gltf-binary"));
        assert_eq!(asset.digest_hex().len(), 64);
    }

    #[tokio::test]
    async fn directory_missing_file_is_404() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = DirectoryFetcher::new(dir.path());
        let asset = fetcher
            .fetch(&Locator::parse("/missing.glb").expect("locator"))
            .await
            .expect("fetch");
        assert_eq!(asset.status, 404);
        assert!(!asset.is_success());
    }

    #[tokio::test]
    async fn directory_rejects_parent_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = DirectoryFetcher::new(dir.path());
        let err = fetcher
            .fetch(&Locator::parse("/../secret.glb").expect("locator"))
            .await
            .expect_err("traversal");
        assert!(matches!(err, FetchError::Unresolvable { .. }));
    }

    #[tokio::test]
    async fn http_fetch_reports_headers() {
        let base = spawn_server().await;
        let fetcher = HttpFetcher::new(Some(base));
        let asset = fetcher
            .fetch(&Locator::parse("/cantina.glb").expect("locator"))
            .await
            .expect("fetch");
        assert_eq!(asset.status, 200);
        assert_eq!(asset.reason, "OK");
        assert_eq!(asset.content_length, Some(1000));
        assert_eq!(asset.content_type.as_deref(), Some("model/gltf-binary"));
        assert_eq!(asset.byte_len(), 1000);
    }

    #[tokio::test]
    async fn http_missing_route_is_404() {
        let base = spawn_server().await;
        let fetcher = HttpFetcher::new(Some(base));
        let asset = fetcher
            .fetch(&Locator::parse("/nope.glb").expect("locator"))
            .await
            .expect("fetch");
        assert_eq!(asset.status, 404);
        assert_eq!(asset.reason, "Not Found");
    }

    #[tokio::test]
    async fn http_relative_without_base_is_unresolvable() {
        let fetcher = HttpFetcher::new(None);
        let err = fetcher
            .fetch(&Locator::parse("/cantina.glb").expect("locator"))
            .await
            .expect_err("no base");
        assert!(matches!(err, FetchError::Unresolvable { .. }));
    }

    #[tokio::test]
    async fn http_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let fetcher = HttpFetcher::new(None);
        let url = format!("http://{addr}/cantina.glb");
        let err = fetcher
            .fetch(&Locator::parse(&url).expect("locator"))
            .await
            .expect_err("refused");
        assert!(matches!(err, FetchError::Network(_)));
    }
}
