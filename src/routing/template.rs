//! Default handler: render the directory's templates.

use axum::response::{Html, IntoResponse};
use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};

use crate::compiler::namespace::{describe, error_notice, Namespace, Phase, ROOT_TEMPLATE};
use crate::compiler::Dir;
use crate::routing::request::RequestView;
use crate::routing::{Flow, Handler, HandlerError, RequestContext};

/// Which templates a handler executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// One template, usually [`ROOT_TEMPLATE`].
    Named(String),
    /// Several templates, output concatenated in order.
    Concat(Vec<String>),
}

impl Entry {
    /// `html` if the namespace defines it, otherwise the directory's own
    /// templates in file order.
    pub fn for_dir(dir: &Dir) -> Self {
        if dir.namespace.contains(ROOT_TEMPLATE) {
            Entry::Named(ROOT_TEMPLATE.to_string())
        } else {
            Entry::Concat(dir.own_templates.clone())
        }
    }
}

/// Execution data. `page` rather than `dir`: every content file binds
/// `dir` to its own url path.
#[derive(Serialize)]
struct TemplateData<'a> {
    request: RequestView<'a>,
    page: PageView<'a>,
}

#[derive(Serialize)]
struct PageView<'a> {
    url_path: &'a str,
    subdirs: Vec<&'a str>,
}

pub struct TemplateHandler {
    tera: Tera,
    entry: Entry,
    extra: Vec<(String, Value)>,
}

impl TemplateHandler {
    pub fn new(namespace: &Namespace, entry: Entry) -> Result<Self, HandlerError> {
        let tera = namespace
            .compile()
            .map_err(|e| HandlerError::Template(describe(&e)))?;
        Ok(Self {
            tera,
            entry,
            extra: Vec::new(),
        })
    }

    pub fn for_dir(dir: &Dir) -> Result<Self, HandlerError> {
        Self::new(&dir.namespace, Entry::for_dir(dir))
    }

    /// Expose an additional variable to the templates.
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.push((name.into(), value));
        self
    }

    pub fn render(&self, dir: &Dir, request: &RequestContext) -> tera::Result<String> {
        let mut subdirs: Vec<&str> = dir.subdirs.keys().map(String::as_str).collect();
        subdirs.sort_unstable();
        let mut context = Context::from_serialize(TemplateData {
            request: request.view(),
            page: PageView {
                url_path: &dir.url_path,
                subdirs,
            },
        })?;
        for (name, value) in &self.extra {
            context.insert(name.as_str(), value);
        }

        match &self.entry {
            Entry::Named(name) => self.tera.render(name, &context),
            Entry::Concat(names) => {
                let mut out = String::new();
                for name in names {
                    out.push_str(&self.tera.render(name, &context)?);
                }
                Ok(out)
            }
        }
    }

    /// Execute once against a synthetic GET of the directory.
    pub fn probe(&self, dir: &Dir) -> tera::Result<()> {
        self.render(dir, &RequestContext::get(&dir.url_path)).map(|_| ())
    }
}

impl Handler for TemplateHandler {
    fn handle(&self, dir: &Dir, remaining: &[String], request: &RequestContext) -> Flow {
        if !remaining.is_empty() {
            return Flow::Continue;
        }
        let html = match self.render(dir, request) {
            Ok(html) => html,
            Err(e) => {
                let message = describe(&e);
                tracing::warn!(url_path = %dir.url_path, error = %message, "Template execution failed");
                error_notice(Phase::Executing, &message)
            }
        };
        Flow::Stop(Html(html).into_response())
    }
}
