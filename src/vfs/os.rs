//! Filesystem rooted at an OS directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::{Entry, Vfs};

#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative path below the root, rejecting anything that
    /// could escape it.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}: invalid path", path),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl Vfs for OsFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = ?entry.path(), "Skipping entry with non UTF-8 name");
                continue;
            };
            // follows symlinks
            let is_dir = entry.path().is_dir();
            entries.push(Entry { name, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }
}
