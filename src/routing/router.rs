//! Walks the compiled tree one path segment at a time.
//!
//! # Responsibilities
//! - Invoke the handler of every directory passed on the way down
//! - Descend into subdirectories by slug
//! - Fall back to static files for the last segment, then to 404
//!
//! # Design Decisions
//! - Immutable tree, no locks on the request path
//! - A directory without handler is transparent

use axum::response::Response;

use crate::compiler::Dir;
use crate::routing::static_files;
use crate::routing::{Flow, RequestContext};
use crate::vfs::Vfs;

/// Route `request` through the tree rooted at `root`.
pub fn route(root: &Dir, vfs: &dyn Vfs, request: &RequestContext) -> Response {
    let mut dir = root;
    let mut remaining: &[String] = &request.segments;

    loop {
        if let Some(handler) = &dir.handler {
            if let Flow::Stop(response) = handler.handle(dir, remaining, request) {
                return response;
            }
        }

        let Some((next, rest)) = remaining.split_first() else {
            tracing::debug!(path = %request.path, url_path = %dir.url_path, "Path consumed without response");
            return static_files::not_found();
        };

        if let Some(subdir) = dir.subdirs.get(next) {
            dir = subdir;
            remaining = rest;
            continue;
        }

        if rest.is_empty() && request.is_read() {
            return static_files::serve(dir, next, vfs, request);
        }

        tracing::debug!(path = %request.path, url_path = %dir.url_path, segment = %next, "No route");
        return static_files::not_found();
    }
}
