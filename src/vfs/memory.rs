//! In-memory filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use parking_lot::RwLock;

use super::{Entry, Vfs};

/// A map of path → bytes. Parent directories are implied by file paths;
/// empty directories can be added with [`MemFs::mkdir`].
///
/// Mutation goes through `&self`, so a test can edit content behind a
/// running site and reload it.
#[derive(Debug, Default)]
pub struct MemFs {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    dirs: RwLock<BTreeSet<String>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filesystem from `(path, content)` pairs.
    pub fn from_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fs = Self::new();
        for (path, content) in files {
            fs.insert(path, content);
        }
        fs
    }

    /// Create or overwrite a file.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.files
            .write()
            .insert(normalize(path).to_string(), content.into());
    }

    /// Remove a file. Returns whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(normalize(path)).is_some()
    }

    /// Add an (empty) directory.
    pub fn mkdir(&self, path: &str) {
        self.dirs.write().insert(normalize(path).to_string());
    }
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

impl Vfs for MemFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<Entry>> {
        let path = normalize(path);
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };

        // name -> is_dir
        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        let mut found = path.is_empty();

        let files = self.files.read();
        let dirs = self.dirs.read();
        let all_paths = files
            .keys()
            .map(|k| (k.as_str(), false))
            .chain(dirs.iter().map(|d| (d.as_str(), true)));

        for (candidate, explicit_dir) in all_paths {
            if candidate == path && explicit_dir {
                found = true;
                continue;
            }
            let Some(rest) = candidate.strip_prefix(&prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            found = true;
            match rest.split_once('/') {
                Some((child, _)) => {
                    children.insert(child.to_string(), true);
                }
                None => {
                    let is_dir = children.get(rest).copied().unwrap_or(false) || explicit_dir;
                    children.insert(rest.to_string(), is_dir);
                }
            }
        }

        if !found {
            if files.contains_key(path) {
                return Err(io::Error::new(io::ErrorKind::Other, format!("{}: not a directory", path)));
            }
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("{}: no such directory", path)));
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| Entry { name, is_dir })
            .collect())
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .read()
            .get(normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", path)))
    }
}
