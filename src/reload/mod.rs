//! Reload subsystem.
//!
//! # Data Flow
//! ```text
//! /reload, /git-reload, file watcher
//!     → reloader.rs (limiter: run now or coalesce into the next tick)
//!     → git.rs (optional: status, fetch, reset to origin)
//!     → site.rs (fresh broker → compile → ready → swap snapshot)
//! ```
//!
//! # Design Decisions
//! - The snapshot lives in an `ArcSwap`; requests never wait for a reload
//! - A failed compile keeps the previous snapshot
//! - Limiter state and execution share one lock, so reloads never overlap

pub mod git;
pub mod limiter;
pub mod reloader;
pub mod site;

use thiserror::Error;

use crate::compiler::CompileError;

pub use git::{GitSync, SourceSync, SyncError};
pub use limiter::{Limiter, Outcome};
pub use reloader::{ReloadResult, Reloader};
pub use site::{Site, Snapshot};

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}
