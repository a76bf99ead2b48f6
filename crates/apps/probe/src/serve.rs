use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use streaming::{AssetFetcher, DirectoryFetcher, FetchError, Locator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    assets: Arc<DirectoryFetcher>,
}

pub fn router(root: PathBuf) -> Router {
    let state = AppState {
        assets: Arc::new(DirectoryFetcher::new(root)),
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(healthz))
        .fallback(serve_asset)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, root: PathBuf) -> anyhow::Result<()> {
    info!("serving {} on http://{addr}", root.display());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(root)).await?;
    Ok(())
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn serve_asset(State(state): State<AppState>, uri: Uri) -> Response {
    let Ok(path) = urlencoding::decode(uri.path()) else {
        return (StatusCode::BAD_REQUEST, "path is not valid UTF-8").into_response();
    };
    let locator = Locator::Path(path.into_owned());
    match state.assets.fetch(&locator).await {
        Ok(asset) if asset.is_success() => {
            let mut headers = HeaderMap::new();
            let content_type = asset
                .content_type
                .as_deref()
                .unwrap_or("application/octet-stream");
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_str(content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
            );
            (StatusCode::OK, headers, Body::from(asset.body)).into_response()
        }
        Ok(_) => (StatusCode::NOT_FOUND, "not found").into_response(),
        Err(FetchError::Unresolvable { reason, .. }) => {
            (StatusCode::BAD_REQUEST, reason).into_response()
        }
        Err(err) => {
            error!("asset read failed: {locator} -> {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "read failed").into_response()
        }
    }
}
