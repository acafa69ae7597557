//! The active content tree and how it is replaced.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::response::Response;
use parking_lot::Mutex;

use crate::compiler::{compile, Config, Dir, ErrorRecord};
use crate::observability::metrics;
use crate::pubsub::Broker;
use crate::reload::ReloadError;
use crate::routing::{self, RequestContext};
use crate::vfs::Vfs;

/// One compiled generation of the site.
#[derive(Debug)]
pub struct Snapshot {
    pub root: Arc<Dir>,
    pub errors: Vec<ErrorRecord>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            root: Arc::new(Dir::empty_root()),
            errors: Vec::new(),
        }
    }
}

/// Content filesystem, compiler configuration and the current snapshot.
///
/// Requests load the snapshot once and route against it, so a reload never
/// changes the tree under a request in flight.
pub struct Site {
    vfs: Arc<dyn Vfs>,
    config: Config,
    current: ArcSwap<Snapshot>,
    reloading: Mutex<()>,
}

impl Site {
    /// A site serving nothing until the first [`Site::reload`].
    pub fn new(vfs: Arc<dyn Vfs>, config: Config) -> Self {
        Self {
            vfs,
            config,
            current: ArcSwap::from_pointee(Snapshot::empty()),
            reloading: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.current.load().errors.clone()
    }

    /// Compile the content with a fresh broker and swap the result in.
    ///
    /// Blocks for the whole compile. If the root cannot be listed the
    /// previous snapshot stays active.
    pub fn reload(&self) -> Result<Vec<ErrorRecord>, ReloadError> {
        let _guard = self.reloading.lock();
        let start = Instant::now();

        let broker = Broker::new();
        let compiled = match compile(&self.config, self.vfs.as_ref(), &broker) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::error!(error = %e, "Reload failed, keeping previous content");
                metrics::record_reload(false);
                return Err(e.into());
            }
        };
        broker.ready();

        let errors = compiled.errors.clone();
        self.current.store(Arc::new(Snapshot {
            root: compiled.root,
            errors: compiled.errors,
        }));

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            errors = errors.len(),
            "Content reloaded"
        );
        metrics::record_reload(true);
        metrics::set_compile_errors(errors.len());
        Ok(errors)
    }

    /// Route a request against the current snapshot.
    pub fn route(&self, request: &RequestContext) -> Response {
        let snapshot = self.current.load_full();
        routing::route(&snapshot.root, self.vfs.as_ref(), request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemFs;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    async fn get(site: &Site, path: &str) -> (StatusCode, String) {
        let response = site.route(&RequestContext::get(path));
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_reload_replaces_content() {
        let fs = Arc::new(MemFs::from_files([("index.md", "# Hello")]));
        let site = Site::new(fs.clone(), Config::standard());

        assert_eq!(get(&site, "/").await.0, StatusCode::NOT_FOUND);

        site.reload().unwrap();
        assert!(get(&site, "/").await.1.contains("<h1>Hello</h1>"));

        fs.insert("index.md", "# Updated");
        let held = site.snapshot();
        site.reload().unwrap();
        assert!(get(&site, "/").await.1.contains("<h1>Updated</h1>"));

        // an old snapshot stays intact
        assert!(held.root.namespace.lookup("index").unwrap().contains("Hello"));
    }

    #[tokio::test]
    async fn test_errors_are_replaced_per_reload() {
        let fs = Arc::new(MemFs::from_files([("index.html", "{% if %}")]));
        let site = Site::new(fs.clone(), Config::standard());

        assert_eq!(site.reload().unwrap().len(), 1);
        assert_eq!(site.errors().len(), 1);

        fs.insert("index.html", "fixed");
        assert!(site.reload().unwrap().is_empty());
        assert!(site.errors().is_empty());
    }
}
