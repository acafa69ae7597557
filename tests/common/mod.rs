//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sitetree::config::TimeoutConfig;
use sitetree::reload::{Reloader, Site, SourceSync};
use sitetree::vfs::{MemFs, Vfs};
use sitetree::{AppState, Config, HttpServer, Shutdown};

pub const SECRET: &str = "test-secret";

/// Site over `fs`, compiled once, wrapped in a server.
pub fn server_for(fs: Arc<dyn Vfs>, source: Option<Arc<dyn SourceSync>>) -> (HttpServer, Arc<Site>) {
    let site = Arc::new(Site::new(fs, Config::standard()));
    site.reload().unwrap();
    let reloader = Arc::new(Reloader::new(site.clone(), source, Duration::from_secs(60), 2));
    let state = AppState {
        site: site.clone(),
        reloader,
        secret: SECRET.into(),
    };
    (HttpServer::new(state, &TimeoutConfig::default()), site)
}

pub fn mem_server(files: &[(&str, &str)]) -> (HttpServer, Arc<MemFs>) {
    let fs = Arc::new(MemFs::from_files(files.iter().copied()));
    let (server, _) = server_for(fs.clone(), None);
    (server, fs)
}

/// Run `server` on an ephemeral port until `shutdown` fires.
#[allow(dead_code)]
pub async fn spawn(server: HttpServer, shutdown: &Shutdown) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    addr
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
