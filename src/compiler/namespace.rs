//! Copy-on-write template namespaces.
//!
//! Every compiled directory owns a namespace: its parent's templates plus
//! whatever its own content files defined. Cloning only bumps reference
//! counts; the first `define` on a clone copies the underlying map, so a
//! child can never leak definitions into its parent or its siblings.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tera::{Tera, Value};

/// The template every directory renders by default.
pub const ROOT_TEMPLATE: &str = "html";

/// A function callable from templates, e.g. `{% set posts = latest_blog() %}`.
pub type TemplateFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Namespace {
    templates: Arc<BTreeMap<String, Arc<str>>>,
    functions: Arc<BTreeMap<String, TemplateFn>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named template.
    pub fn define(&mut self, name: impl Into<String>, body: impl Into<Arc<str>>) {
        Arc::make_mut(&mut self.templates).insert(name.into(), body.into());
    }

    pub fn register_function(&mut self, name: impl Into<String>, function: TemplateFn) {
        Arc::make_mut(&mut self.functions).insert(name.into(), function);
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(|body| body.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Build an executable template set from this namespace.
    pub fn compile(&self) -> tera::Result<Tera> {
        let mut tera = Tera::default();
        // template names carry no extension, so match every name
        tera.autoescape_on(vec![""]);
        tera.set_escape_fn(escape_html);
        tera.add_raw_templates(
            self.templates
                .iter()
                .map(|(name, body)| (name.as_str(), &**body)),
        )?;
        for (name, function) in self.functions.iter() {
            tera.register_function(name, SharedFunction(function.clone()));
        }
        Ok(tera)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

struct SharedFunction(TemplateFn);

impl tera::Function for SharedFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        (self.0)(args)
    }
}

/// Escape a value printed with `{{ … }}`.
///
/// Only the characters that can open markup or leave an attribute are
/// replaced; `/` stays readable so url paths print as they are.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Parse a single template body in isolation.
pub fn check_syntax(name: &str, body: &str) -> tera::Result<()> {
    Tera::default().add_raw_template(name, body)
}

/// Which phase produced an inline error notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parsing,
    Executing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Parsing => f.write_str("parsing"),
            Phase::Executing => f.write_str("executing"),
        }
    }
}

/// The inline block rendered in place of broken content.
///
/// The result is itself valid template source: braces are escaped so the
/// message can never be interpreted as template syntax.
pub fn error_notice(phase: Phase, message: &str) -> String {
    let escaped = tera::escape_html(message)
        .replace('{', "&#123;")
        .replace('}', "&#125;");
    format!(
        r#"<p style="border: solid red 2px; border-radius: 8px; padding: 12px">Error {} template: {}</p>"#,
        phase, escaped
    )
}

/// Flatten an error and its sources into one line.
///
/// Template engine errors keep the useful part (line, column, cause) in
/// their source chain.
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_copy_on_write() {
        let mut parent = Namespace::new();
        parent.define("html", "<main>{% include \"main\" ignore missing %}</main>");

        let mut child = parent.clone();
        child.define("main", "child");

        assert!(child.contains("main"));
        assert!(child.contains("html"));
        assert!(!parent.contains("main"));
    }

    #[test]
    fn test_compile_renders_includes() {
        let mut ns = Namespace::new();
        ns.define("html", "<main>{% include \"main\" ignore missing %}</main>");
        let tera = ns.compile().unwrap();
        let out = tera.render("html", &tera::Context::new()).unwrap();
        assert_eq!(out, "<main></main>");

        ns.define("main", "<h1>Hello</h1>");
        let tera = ns.compile().unwrap();
        let out = tera.render("html", &tera::Context::new()).unwrap();
        assert_eq!(out, "<main><h1>Hello</h1></main>");
    }

    #[test]
    fn test_registered_function_is_callable() {
        let mut ns = Namespace::new();
        ns.register_function(
            "answer",
            Arc::new(|_args: &HashMap<String, Value>| -> tera::Result<Value> { Ok(Value::from(42)) }),
        );
        ns.define("html", "{% set n = answer() %}{{ n }}");
        let tera = ns.compile().unwrap();
        assert_eq!(tera.render("html", &tera::Context::new()).unwrap(), "42");
    }

    #[test]
    fn test_printed_values_are_escaped() {
        let mut ns = Namespace::new();
        ns.define("html", "<a href=\"{{ path }}\">{{ text }}</a>{{ markup | safe }}");
        let tera = ns.compile().unwrap();

        let mut context = tera::Context::new();
        context.insert("path", "/blog/a-post");
        context.insert("text", "<script>alert('x') & \"y\"</script>");
        context.insert("markup", "<em>ok</em>");
        assert_eq!(
            tera.render("html", &context).unwrap(),
            "<a href=\"/blog/a-post\">&lt;script&gt;alert(&#39;x&#39;) &amp; &#34;y&#34;&lt;/script&gt;</a><em>ok</em>"
        );
    }

    #[test]
    fn test_check_syntax() {
        assert!(check_syntax("ok", "{{ value }}").is_ok());
        assert!(check_syntax("broken", "{% if %}").is_err());
    }

    #[test]
    fn test_error_notice_is_escaped_and_inert() {
        let notice = error_notice(Phase::Parsing, "<b>{{ boom }}</b>");
        assert!(notice.contains("Error parsing template"));
        assert!(!notice.contains("<b>"));
        assert!(!notice.contains("{{"));
        assert!(check_syntax("notice", &notice).is_ok());
    }
}
