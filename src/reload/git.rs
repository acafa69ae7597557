//! Synchronizing the content directory with its upstream.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Output};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("git reload has no effect when running in a terminal")]
    Terminal,

    #[error("git working copy has local changes")]
    LocalChanges,

    #[error("error running git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error running git {command}: {status}: {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Brings the content directory up to date before a reload.
pub trait SourceSync: Send + Sync {
    fn sync(&self) -> Result<(), SyncError>;
}

/// Hard-resets a git working copy to `origin`.
///
/// Local commits cannot be told apart from upstream history rewrites, so
/// any local change makes the sync fail, and it refuses to run when
/// attached to a terminal. Dropped commits stay reachable via the reflog.
#[derive(Debug, Clone)]
pub struct GitSync {
    dir: PathBuf,
}

impl GitSync {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn git(&self, args: &[&str]) -> Result<Output, SyncError> {
        let command = args.join(" ");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|source| SyncError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SyncError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// The sync steps without the terminal check.
    fn run(&self) -> Result<(), SyncError> {
        let status = self.git(&["status", "--porcelain"])?;
        if !status.stdout.is_empty() {
            return Err(SyncError::LocalChanges);
        }
        self.git(&["fetch"])?;
        self.git(&["reset", "--hard", "origin"])?;
        tracing::info!(dir = %self.dir.display(), "Content synchronized with origin");
        Ok(())
    }
}

impl SourceSync for GitSync {
    fn sync(&self) -> Result<(), SyncError> {
        if std::io::stdout().is_terminal() {
            return Err(SyncError::Terminal);
        }
        self.run()
    }
}
