//! Compiled directory nodes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compiler::namespace::Namespace;
use crate::routing::Handler;

/// One source directory after compilation. Immutable once built.
pub struct Dir {
    /// Name on disk, `""` for the root.
    pub name: String,
    /// `/` for the root, `/a/b` below it.
    pub url_path: String,
    /// Relative path in the content filesystem.
    pub fs_path: String,
    /// Children keyed by slug.
    pub subdirs: BTreeMap<String, Dir>,
    /// Inherited templates plus the ones defined here.
    pub namespace: Namespace,
    /// Templates defined by this directory's own files, in file order.
    pub own_templates: Vec<String>,
    /// Files no processor or generator claimed.
    pub static_files: BTreeSet<String>,
    /// At least one non-empty content file lives here.
    pub has_content: bool,
    pub handler: Option<Box<dyn Handler>>,
}

impl Dir {
    /// The tree served before the first successful compile.
    pub fn empty_root() -> Self {
        Self {
            name: String::new(),
            url_path: "/".to_string(),
            fs_path: String::new(),
            subdirs: BTreeMap::new(),
            namespace: Namespace::new(),
            own_templates: Vec::new(),
            static_files: BTreeSet::new(),
            has_content: false,
            handler: None,
        }
    }

    /// Number of directories in this subtree, itself included.
    pub fn count(&self) -> usize {
        1 + self.subdirs.values().map(Dir::count).sum::<usize>()
    }
}

impl fmt::Debug for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dir")
            .field("url_path", &self.url_path)
            .field("fs_path", &self.fs_path)
            .field("own_templates", &self.own_templates)
            .field("static_files", &self.static_files)
            .field("has_content", &self.has_content)
            .field("handler", &self.handler.is_some())
            .field("subdirs", &self.subdirs)
            .finish()
    }
}

/// A non-fatal problem found while compiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub urlpath: String,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(urlpath: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            urlpath: urlpath.into(),
            message: message.into(),
        }
    }
}
