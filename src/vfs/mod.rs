//! Virtual filesystem subsystem.
//!
//! # Responsibilities
//! - Enumerate directories in a stable, lexical order
//! - Read file contents by relative path
//!
//! # Design Decisions
//! - Paths are relative and slash-separated; `""` is the root
//! - The compiler and static file fallback only ever see a `dyn Vfs`,
//!   so tests run against `MemFs` and the binary against `OsFs`

pub mod memory;
pub mod os;

use std::io;

pub use memory::MemFs;
pub use os::OsFs;

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

impl Entry {
    pub fn file(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_dir: false }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_dir: true }
    }

    /// Hidden entries start with a dot and are never compiled or served.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Read-only access to a tree of files.
pub trait Vfs: Send + Sync {
    /// List the entries of a directory, sorted by name.
    fn read_dir(&self, path: &str) -> io::Result<Vec<Entry>>;

    /// Read a whole file.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Join two relative paths.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}
