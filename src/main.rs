use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use uuid::Uuid;

use sitetree::config::{load_config, validate_config, ConfigError, ContentWatcher, SiteConfig};
use sitetree::lifecycle::{shutdown_on_signal, Shutdown};
use sitetree::observability::{logging, metrics};
use sitetree::reload::{GitSync, Outcome, Reloader, Site, SourceSync};
use sitetree::vfs::OsFs;
use sitetree::{AppState, Config, HttpServer};

/// Serve a content directory.
#[derive(Debug, Parser)]
#[command(name = "sitetree", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, env = "SITETREE_CONFIG")]
    config: Option<PathBuf>,

    /// Content root directory.
    #[arg(short, long)]
    root: Option<String>,

    /// Listen address, e.g. 127.0.0.1:8080.
    #[arg(short, long, env = "LISTEN")]
    listen: Option<String>,

    /// Secret for the reload endpoints.
    #[arg(long, env = "SECRET", hide_env_values = true)]
    secret: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<SiteConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SiteConfig::default(),
        };
        if let Some(root) = self.root {
            config.content.root = root;
        }
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(secret) = self.secret {
            config.reload.secret = Some(secret);
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!("sitetree v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        root = %config.content.root,
        bind_address = %config.listener.bind_address,
        git = config.content.git,
        watch = config.reload.watch,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let secret = match config.reload.secret.clone() {
        Some(secret) => secret,
        None => {
            let secret = Uuid::new_v4().simple().to_string();
            tracing::info!(secret = %secret, "Generated temporary reload secret");
            secret
        }
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Initial compile; a root that cannot be listed is fatal
    let root = PathBuf::from(&config.content.root);
    let site = Arc::new(Site::new(Arc::new(OsFs::new(&root)), Config::standard()));
    let errors = site.reload()?;
    if !errors.is_empty() {
        tracing::warn!(count = errors.len(), "Content compiled with errors, see /errors");
    }

    let source = config
        .content
        .git
        .then(|| Arc::new(GitSync::new(&root)) as Arc<dyn SourceSync>);
    let reloader = Arc::new(Reloader::new(
        site.clone(),
        source,
        Duration::from_secs(config.reload.interval_secs),
        config.reload.capacity,
    ));

    let shutdown = Shutdown::new();
    let mut tasks = reloader.spawn_tickers(&shutdown);
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    // Kept alive until shutdown; dropping it stops watching
    let _watcher = if config.reload.watch {
        let (watcher, changes) = ContentWatcher::new(&root);
        let watcher = watcher.run()?;
        tasks.push(tokio::spawn(reload_on_change(
            changes,
            reloader.clone(),
            shutdown.subscribe(),
        )));
        Some(watcher)
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = AppState {
        site,
        reloader,
        secret: secret.into(),
    };
    HttpServer::new(state, &config.timeouts)
        .run(listener, shutdown.subscribe())
        .await?;

    // the server also stops on its own errors; make sure the rest follows
    shutdown.trigger();
    for task in tasks {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Feed file changes into the rate-limited reload.
async fn reload_on_change(
    mut changes: mpsc::UnboundedReceiver<PathBuf>,
    reloader: Arc<Reloader>,
    shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let stop = Shutdown::wait(shutdown);
    tokio::pin!(stop);
    loop {
        tokio::select! {
            change = changes.recv() => {
                let Some(path) = change else { break };
                tracing::debug!(path = %path.display(), "Reloading after content change");
                let reloader = reloader.clone();
                match tokio::task::spawn_blocking(move || reloader.trigger_reload()).await {
                    Ok(Outcome::Executed(Err(e))) => tracing::error!(error = %e, "Reload after content change failed"),
                    Ok(Outcome::Scheduled(_)) => tracing::debug!("Reload scheduled for the next interval"),
                    Ok(Outcome::Executed(Ok(()))) => {}
                    Err(e) => tracing::error!(error = %e, "Reload task panicked"),
                }
            }
            _ = &mut stop => break,
        }
    }
}
