use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;
use tracing::debug;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

pub async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    serve_static_file(&path)
}

/// Serves one embedded asset with a one-hour cache lifetime.
pub fn serve_static_file(path: &str) -> Response {
    let path = path.trim_start_matches('/');

    let Some(asset) = StaticAssets::get(path) else {
        debug!("Static asset not found: {}", path);
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        [
            (header::CONTENT_TYPE, mime.essence_str().to_string()),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        asset.data.into_owned(),
    )
        .into_response()
}
