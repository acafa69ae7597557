//! Static file fallback.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::compiler::Dir;
use crate::routing::RequestContext;
use crate::vfs::{self, Vfs};

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

/// Serve `name` from `dir` if the compiler exposed it as a static file.
///
/// HEAD gets the headers of the equivalent GET without a body.
pub fn serve(dir: &Dir, name: &str, vfs: &dyn Vfs, request: &RequestContext) -> Response {
    if !dir.static_files.contains(name) {
        return not_found();
    }

    let path = vfs::join(&dir.fs_path, name);
    let bytes = match vfs.read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Static file vanished since last reload");
            return not_found();
        }
    };

    let mime = mime_guess::from_path(name).first_or_octet_stream();
    let length = bytes.len();
    let body = if request.method == axum::http::Method::HEAD {
        Body::empty()
    } else {
        Body::from(bytes)
    };

    (
        [
            (header::CONTENT_TYPE, mime.essence_str().to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        body,
    )
        .into_response()
}
