//! Content tree compiler.
//!
//! # Responsibilities
//! - Turn a content filesystem into a tree of [`Dir`] nodes
//! - Dispatch every file to a handler generator, a content processor or the
//!   static file set
//! - Collect per-file problems as [`ErrorRecord`]s without aborting the pass
//!
//! # Data Flow
//! ```text
//! read_dir(dir)
//!     → files: handler by name > handler by extension > content by extension > static
//!     → content: process → check syntax → define in a clone of the parent namespace
//!     → subdirs: recurse with the namespace built so far
//!     → handler: generated last, once the subtree is complete
//! ```
//!
//! # Design Decisions
//! - The configuration is an explicit value, never global state
//! - Only failing to list the root is fatal; a broken subtree is recorded
//!   and left out
//! - A directory with no content and no handler file gets no handler, so
//!   it is transparent to routing

mod dir;
pub mod namespace;
pub mod slug;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::content::{
    ContentContext, ContentProcessor, HtmlProcessor, LatestProcessor, MarkdownProcessor,
};
use crate::pubsub::Broker;
use crate::routing::{BlogGenerator, Handler, HandlerGenerator, RedirectGenerator, TemplateHandler};
use crate::vfs::{self, Vfs};

pub use dir::{Dir, ErrorRecord};
use namespace::{check_syntax, describe, error_notice, Namespace, Phase};

/// Which processors and generators the compiler dispatches to.
///
/// Content keys are extensions including the dot (`.md`); handler keys are
/// either exact file names (`redirect`) or extensions.
#[derive(Clone, Default)]
pub struct Config {
    pub content: HashMap<String, Arc<dyn ContentProcessor>>,
    pub handlers: HashMap<String, Arc<dyn HandlerGenerator>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// `.html`, `.md` and `.latest` content; `redirect` and `blog` handlers.
    pub fn standard() -> Self {
        Self::new()
            .with_content(".html", HtmlProcessor)
            .with_content(".md", MarkdownProcessor::default())
            .with_content(".latest", LatestProcessor)
            .with_handler("redirect", RedirectGenerator)
            .with_handler("blog", BlogGenerator)
    }

    pub fn with_content(mut self, ext: impl Into<String>, processor: impl ContentProcessor + 'static) -> Self {
        self.content.insert(ext.into(), Arc::new(processor));
        self
    }

    pub fn with_handler(mut self, key: impl Into<String>, generator: impl HandlerGenerator + 'static) -> Self {
        self.handlers.insert(key.into(), Arc::new(generator));
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut content: Vec<_> = self.content.keys().collect();
        content.sort();
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("Config")
            .field("content", &content)
            .field("handlers", &handlers)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read directory '{path}': {source}")]
    ReadDir {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Result of one compile pass.
#[derive(Debug)]
pub struct Compiled {
    pub root: Arc<Dir>,
    pub errors: Vec<ErrorRecord>,
}

/// Compile the whole tree below the root of `vfs`.
///
/// The caller owns the broker and calls [`Broker::ready`] once the pass is
/// done.
pub fn compile(config: &Config, vfs: &dyn Vfs, broker: &Broker) -> Result<Compiled, CompileError> {
    let mut pass = Pass {
        config,
        vfs,
        broker,
        errors: Vec::new(),
    };
    let root = pass
        .load_dir(&Namespace::new(), "", "/".to_string(), String::new())
        .map_err(|source| CompileError::ReadDir {
            path: "/".to_string(),
            source,
        })?;

    tracing::debug!(dirs = root.count(), errors = pass.errors.len(), "Compiled content tree");
    Ok(Compiled {
        root: Arc::new(root),
        errors: pass.errors,
    })
}

/// Split `name` at its last dot: `"a.tar.gz"` → `("a.tar", Some(".gz"))`.
pub fn split_ext(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(i) => (&name[..i], Some(&name[i..])),
        None => (name, None),
    }
}

struct Pass<'a> {
    config: &'a Config,
    vfs: &'a dyn Vfs,
    broker: &'a Broker,
    errors: Vec<ErrorRecord>,
}

struct HandlerFile {
    generator: Arc<dyn HandlerGenerator>,
    stem: String,
    name: String,
}

impl Pass<'_> {
    fn record(&mut self, url_path: &str, message: String) {
        tracing::warn!(url_path = %url_path, error = %message, "Compile error");
        self.errors.push(ErrorRecord::new(url_path, message));
    }

    fn load_dir(
        &mut self,
        parent: &Namespace,
        fs_path: &str,
        url_path: String,
        name: String,
    ) -> io::Result<Dir> {
        let entries = self.vfs.read_dir(fs_path)?;

        let mut namespace = parent.clone();
        let mut own_templates = Vec::new();
        let mut static_files = BTreeSet::new();
        let mut has_content = false;
        let mut handler_file: Option<HandlerFile> = None;
        let mut subdir_names = Vec::new();

        for entry in entries {
            if entry.is_hidden() {
                continue;
            }
            if entry.is_dir {
                subdir_names.push(entry.name);
                continue;
            }

            let (stem, ext) = split_ext(&entry.name);
            let by_name = self.config.handlers.get(&entry.name).map(|g| (g, ""));
            let by_ext = ext.and_then(|e| self.config.handlers.get(e)).map(|g| (g, stem));

            if let Some((generator, stem)) = by_name.or(by_ext) {
                if let Some(previous) = &handler_file {
                    tracing::warn!(
                        url_path = %url_path,
                        replaced = %previous.name,
                        file = %entry.name,
                        "Several handler files in one directory, the last one wins"
                    );
                }
                handler_file = Some(HandlerFile {
                    generator: generator.clone(),
                    stem: stem.to_string(),
                    name: entry.name.clone(),
                });
            } else if let Some(processor) = ext.and_then(|e| self.config.content.get(e)) {
                let processor = processor.clone();
                let stem = stem.to_string();
                let Some(non_empty) =
                    self.load_content(&mut namespace, processor.as_ref(), fs_path, &url_path, &entry.name, &stem)
                else {
                    continue;
                };
                has_content |= non_empty;
                if !own_templates.contains(&stem) {
                    own_templates.push(stem);
                }
            } else {
                static_files.insert(entry.name);
            }
        }

        let mut subdirs = BTreeMap::new();
        for subdir_name in subdir_names {
            let slug = slug::slugify(&subdir_name);
            if slug.is_empty() {
                tracing::warn!(url_path = %url_path, dir = %subdir_name, "Directory name has no usable characters, skipped");
                continue;
            }
            let child_url = if url_path == "/" {
                format!("/{}", slug)
            } else {
                format!("{}/{}", url_path, slug)
            };
            let child_fs = vfs::join(fs_path, &subdir_name);

            match self.load_dir(&namespace, &child_fs, child_url.clone(), subdir_name.clone()) {
                Ok(child) => {
                    if let Some(replaced) = subdirs.insert(slug, child) {
                        tracing::warn!(
                            url_path = %child_url,
                            replaced = %replaced.name,
                            dir = %subdir_name,
                            "Directory names collide after slugification, the last one wins"
                        );
                    }
                }
                Err(e) => self.record(&child_url, format!("failed to read directory '{}': {}", child_fs, e)),
            }
        }

        let mut dir = Dir {
            name,
            url_path,
            fs_path: fs_path.to_string(),
            subdirs,
            namespace,
            own_templates,
            static_files,
            has_content,
            handler: None,
        };
        dir.handler = self.generate_handler(&dir, handler_file);
        Ok(dir)
    }

    /// Run one content file through its processor and define the result.
    /// Returns whether the file had any content, or `None` if it could not
    /// be read and nothing was defined.
    fn load_content(
        &mut self,
        namespace: &mut Namespace,
        processor: &dyn ContentProcessor,
        fs_path: &str,
        url_path: &str,
        file_name: &str,
        stem: &str,
    ) -> Option<bool> {
        let path = vfs::join(fs_path, file_name);
        let bytes = match self.vfs.read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.record(url_path, format!("failed to read '{}': {}", path, e));
                return None;
            }
        };

        let ctx = ContentContext {
            url_path: url_path.trim_end_matches('/'),
            file_root: stem,
            broker: self.broker,
        };
        let body = match processor.process(&ctx, &bytes) {
            Ok(contribution) => {
                for (name, function) in contribution.functions {
                    namespace.register_function(name, function);
                }
                match check_syntax(stem, &contribution.body) {
                    Ok(()) => contribution.body,
                    Err(e) => {
                        let message = describe(&e);
                        self.record(url_path, format!("{}: {}", file_name, message));
                        error_notice(Phase::Parsing, &message)
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.record(url_path, format!("{}: {}", file_name, message));
                error_notice(Phase::Parsing, &message)
            }
        };
        namespace.define(stem, body);

        Some(!String::from_utf8_lossy(&bytes).trim().is_empty())
    }

    fn generate_handler(&mut self, dir: &Dir, handler_file: Option<HandlerFile>) -> Option<Box<dyn Handler>> {
        match handler_file {
            Some(file) => {
                let path = vfs::join(&dir.fs_path, &file.name);
                let content = match self.vfs.read(&path) {
                    Ok(content) => content,
                    Err(e) => {
                        self.record(&dir.url_path, format!("failed to read '{}': {}", path, e));
                        return None;
                    }
                };
                match file.generator.generate(dir, &file.stem, &content, self.broker) {
                    Ok(handler) => Some(handler),
                    Err(e) => {
                        self.record(&dir.url_path, format!("{}: {}", file.name, e));
                        None
                    }
                }
            }
            None if dir.has_content => match TemplateHandler::for_dir(dir) {
                Ok(handler) => {
                    if let Err(e) = handler.probe(dir) {
                        self.record(&dir.url_path, format!("{} template: {}", Phase::Executing, describe(&e)));
                    }
                    Some(Box::new(handler))
                }
                Err(e) => {
                    self.record(&dir.url_path, e.to_string());
                    None
                }
            },
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{route, Flow, HandlerError, RequestContext};
    use crate::vfs::{Entry, MemFs};
    use axum::body::to_bytes;
    use axum::response::IntoResponse;

    fn compile_fs(fs: &dyn Vfs) -> Compiled {
        let broker = Broker::new();
        let compiled = compile(&Config::standard(), fs, &broker).unwrap();
        broker.ready();
        compiled
    }

    async fn render(fs: &dyn Vfs, root: &Dir, path: &str) -> String {
        let response = route(root, fs, &RequestContext::get(path));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_split_ext() {
        assert_eq!(split_ext("a.tar.gz"), ("a.tar", Some(".gz")));
        assert_eq!(split_ext("index.md"), ("index", Some(".md")));
        assert_eq!(split_ext("redirect"), ("redirect", None));
    }

    #[test]
    fn test_tree_shape() {
        let fs = MemFs::from_files([
            ("index.md", "# Home"),
            ("style.css", "body {}"),
            (".hidden.md", "# secret"),
            (".git/config", "[core]"),
            ("Blog Posts/index.md", "# Posts"),
            ("assets/logo.svg", "<svg/>"),
        ]);
        let compiled = compile_fs(&fs);
        let root = &compiled.root;

        assert!(compiled.errors.is_empty(), "{:?}", compiled.errors);
        assert_eq!(root.url_path, "/");
        assert_eq!(root.own_templates, vec!["index"]);
        assert!(root.static_files.contains("style.css"));
        assert!(!root.namespace.contains(".hidden"));
        assert_eq!(root.subdirs.keys().collect::<Vec<_>>(), vec!["assets", "blog-posts"]);

        let posts = &root.subdirs["blog-posts"];
        assert_eq!(posts.url_path, "/blog-posts");
        assert_eq!(posts.fs_path, "Blog Posts");
        assert!(posts.handler.is_some());

        // only static assets: no handler
        assert!(root.subdirs["assets"].handler.is_none());
    }

    #[tokio::test]
    async fn test_namespace_inheritance() {
        let fs = MemFs::from_files([
            ("html.html", "<main>{% include \"main\" ignore missing %}</main>"),
            ("main.md", "# Home"),
            ("site/main.md", "# Site"),
            ("other/footer.md", "footer"),
        ]);
        let compiled = compile_fs(&fs);
        let root = &compiled.root;

        assert_eq!(render(&fs, root, "/").await, "<main><h1>Home</h1>\n</main>");
        assert_eq!(render(&fs, root, "/site").await, "<main><h1>Site</h1>\n</main>");

        // children never leak into the parent or their siblings
        assert_eq!(root.namespace.lookup("main").map(|b| b.contains("Home")), Some(true));
        assert!(!root.namespace.contains("footer"));
        assert!(!root.subdirs["site"].namespace.contains("footer"));
    }

    #[tokio::test]
    async fn test_syntax_error_is_inline() {
        let fs = MemFs::from_files([
            ("html.html", "{% include \"broken\" ignore missing %}|{% include \"fine\" ignore missing %}"),
            ("broken.html", "{% if %}"),
            ("fine.md", "ok"),
        ]);
        let compiled = compile_fs(&fs);

        assert_eq!(compiled.errors.len(), 1);
        assert_eq!(compiled.errors[0].urlpath, "/");
        assert!(compiled.errors[0].message.starts_with("broken.html: "));

        let body = render(&fs, &compiled.root, "/").await;
        assert!(body.contains("Error parsing template:"));
        assert!(body.contains("<p>ok</p>"));
    }

    #[test]
    fn test_invalid_handler_file_is_recorded() {
        let fs = MemFs::from_files([("moved/redirect", "   ")]);
        let compiled = compile_fs(&fs);
        assert_eq!(compiled.errors.len(), 1);
        assert_eq!(compiled.errors[0].urlpath, "/moved");
        assert!(compiled.root.subdirs["moved"].handler.is_none());
    }

    #[test]
    fn test_execution_error_is_recorded_and_handler_kept() {
        let fs = MemFs::from_files([("index.html", "{{ nope.nope }}")]);
        let compiled = compile_fs(&fs);
        assert_eq!(compiled.errors.len(), 1);
        assert!(compiled.errors[0].message.starts_with("executing template:"));
        assert!(compiled.root.handler.is_some());
    }

    #[test]
    fn test_empty_content_gets_no_handler() {
        let fs = MemFs::from_files([("index.md", "  \n")]);
        let compiled = compile_fs(&fs);
        assert!(!compiled.root.has_content);
        assert!(compiled.root.handler.is_none());
    }

    #[test]
    fn test_slug_collision_last_wins() {
        let fs = MemFs::from_files([("A B/x.md", "first"), ("a-b/y.md", "second"), ("!!!/z.md", "gone")]);
        let compiled = compile_fs(&fs);
        let root = &compiled.root;
        assert_eq!(root.subdirs.len(), 1);
        assert_eq!(root.subdirs["a-b"].name, "a-b");
    }

    struct BrokenSubtree(MemFs, &'static str);

    impl Vfs for BrokenSubtree {
        fn read_dir(&self, path: &str) -> io::Result<Vec<Entry>> {
            if path == self.1 {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.0.read_dir(path)
        }

        fn read(&self, path: &str) -> io::Result<Vec<u8>> {
            self.0.read(path)
        }
    }

    #[test]
    fn test_broken_subtree_is_omitted() {
        let fs = BrokenSubtree(MemFs::from_files([
            ("index.md", "# Home"),
            ("broken/index.md", "# Unreachable"),
            ("fine/index.md", "# Fine"),
        ]), "broken");
        let compiled = compile_fs(&fs);
        assert_eq!(compiled.errors.len(), 1);
        assert_eq!(compiled.errors[0].urlpath, "/broken");
        assert!(compiled.root.subdirs.contains_key("fine"));
        assert!(!compiled.root.subdirs.contains_key("broken"));
    }

    #[test]
    fn test_unreadable_root_is_fatal() {
        let fs = BrokenSubtree(MemFs::from_files([("index.md", "# Home")]), "");
        assert!(matches!(
            compile(&Config::standard(), &fs, &Broker::new()),
            Err(CompileError::ReadDir { .. })
        ));
    }

    #[tokio::test]
    async fn test_latest_widget_sees_blog_compiled_later() {
        // "a-news" is compiled before "blog"; retention bridges the gap
        let fs = MemFs::from_files([
            ("a-news/index.latest", "/blog:1"),
            ("blog/blog", ""),
            ("blog/2024-01-01 Old/index.md", "# Old"),
            ("blog/2024-05-01 New/index.md", "# New"),
        ]);
        let compiled = compile_fs(&fs);
        assert!(compiled.errors.is_empty(), "{:?}", compiled.errors);

        let body = render(&fs, &compiled.root, "/a-news").await;
        assert!(body.contains(r#"<a href="/blog/2024-05-01-new">2024-05-01 New</a>"#));
        assert!(!body.contains("Old"));
    }

    struct UnreadableFile(MemFs, &'static str);

    impl Vfs for UnreadableFile {
        fn read_dir(&self, path: &str) -> io::Result<Vec<Entry>> {
            self.0.read_dir(path)
        }

        fn read(&self, path: &str) -> io::Result<Vec<u8>> {
            if path == self.1 {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.0.read(path)
        }
    }

    #[tokio::test]
    async fn test_unreadable_file_defines_nothing() {
        let fs = UnreadableFile(MemFs::from_files([("a.md", "# A"), ("b.md", "# B")]), "b.md");
        let compiled = compile_fs(&fs);

        assert_eq!(compiled.errors.len(), 1);
        assert!(compiled.errors[0].message.starts_with("failed to read 'b.md'"));
        assert_eq!(compiled.root.own_templates, vec!["a"]);
        assert_eq!(render(&fs, &compiled.root, "/").await, "<h1>A</h1>\n");
    }

    /// Remembers which files it was generated from and answers with its label.
    struct Recording {
        label: &'static str,
        seen: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    struct Label(&'static str);

    impl Handler for Label {
        fn handle(&self, _dir: &Dir, _remaining: &[String], _request: &RequestContext) -> Flow {
            Flow::Stop(self.0.into_response())
        }
    }

    impl HandlerGenerator for Recording {
        fn generate(
            &self,
            _dir: &Dir,
            file_stem: &str,
            _content: &[u8],
            _broker: &Broker,
        ) -> Result<Box<dyn Handler>, HandlerError> {
            self.seen.lock().push(format!("{}:{}", self.label, file_stem));
            Ok(Box::new(Label(self.label)))
        }
    }

    #[tokio::test]
    async fn test_dispatch_priority() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recording = |label| Recording { label, seen: seen.clone() };
        let config = Config::standard()
            .with_handler(".app", recording("by-ext"))
            .with_handler("special.app", recording("by-name"))
            .with_handler(".md", recording("md"));

        let fs = MemFs::from_files([
            ("calendar/events.app", "x"),
            ("special/special.app", "x"),
            ("moved/redirect", "/elsewhere"),
            ("notes/index.md", "# Notes"),
        ]);
        let broker = Broker::new();
        let compiled = compile(&config, &fs, &broker).unwrap();
        broker.ready();
        let root = &compiled.root;
        assert!(compiled.errors.is_empty(), "{:?}", compiled.errors);

        // extension generators get the stem, name generators an empty one
        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec!["by-ext:events", "by-name:", "md:index"]);

        assert_eq!(render(&fs, root, "/calendar").await, "by-ext");
        assert_eq!(render(&fs, root, "/special").await, "by-name");
        assert_eq!(render(&fs, root, "/notes").await, "md");

        // exact names still beat the extension map
        let response = route(root, &fs, &RequestContext::get("/moved"));
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);

        // a handler extension takes the file away from the content processor
        let notes = &root.subdirs["notes"];
        assert!(notes.own_templates.is_empty());
        assert!(!notes.namespace.contains("index"));
        assert!(!notes.static_files.contains("index.md"));
    }
}
