//! "Latest posts" widget fed by a blog elsewhere in the tree.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::{ContentContext, ContentError, ContentProcessor, Contribution};
use crate::compiler::slug::template_name;

const DEFAULT_QUANTITY: usize = 10;

/// File content is `<blog url path>[:<quantity>]`, e.g. `/blog:3`.
///
/// The widget subscribes to the previews the blog publishes and renders the
/// first `quantity` of them as a list of links.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestProcessor;

#[derive(Debug, PartialEq, Eq)]
struct Settings {
    blog: String,
    quantity: usize,
}

fn parse_settings(content: &str) -> Result<Settings, ContentError> {
    let content = content.trim();
    let (path, quantity) = match content.rsplit_once(':') {
        Some((path, quantity)) => (path.trim(), quantity.trim().parse::<usize>().unwrap_or(0)),
        None => (content, 0),
    };
    if path.is_empty() {
        return Err(ContentError::Invalid("missing blog path".into()));
    }

    let mut blog = path.trim_end_matches('/').to_string();
    if !blog.starts_with('/') {
        blog.insert(0, '/');
    }
    Ok(Settings {
        blog,
        quantity: if quantity == 0 { DEFAULT_QUANTITY } else { quantity },
    })
}

impl ContentProcessor for LatestProcessor {
    fn process(&self, ctx: &ContentContext<'_>, content: &[u8]) -> Result<Contribution, ContentError> {
        let settings = parse_settings(std::str::from_utf8(content)?)?;

        let previews = Arc::new(RwLock::new(Value::Array(Vec::new())));
        let sink = previews.clone();
        let quantity = settings.quantity;
        ctx.broker.subscribe(settings.blog, move |data: &Value| {
            let mut latest = match data {
                Value::Array(items) => items.clone(),
                _ => Vec::new(),
            };
            latest.truncate(quantity);
            *sink.write() = Value::Array(latest);
        });

        let function = format!("latest_{}", template_name(&[ctx.url_path, ctx.file_root]));
        let body = format!(
            concat!(
                "{{% set posts = {}() %}}",
                "{{% if posts %}}<ul>",
                "{{% for post in posts %}}",
                r#"<li id="{{{{ post.anchor }}}}"><a href="{{{{ post.url }}}}">{{{{ post.date }}}} {{{{ post.title | safe }}}}</a></li>"#,
                "{{% endfor %}}",
                "</ul>{{% endif %}}"
            ),
            function
        );

        Ok(Contribution::body(body).with_function(
            function,
            Arc::new(move |_args: &HashMap<String, Value>| -> tera::Result<Value> {
                Ok(previews.read().clone())
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::namespace::Namespace;
    use crate::pubsub::Broker;
    use serde_json::json;

    #[test]
    fn test_parse_settings() {
        assert_eq!(
            parse_settings("/blog:3").unwrap(),
            Settings { blog: "/blog".into(), quantity: 3 }
        );
        assert_eq!(
            parse_settings(" blog/ \n").unwrap(),
            Settings { blog: "/blog".into(), quantity: DEFAULT_QUANTITY }
        );
        assert!(parse_settings("  ").is_err());
    }

    #[test]
    fn test_renders_published_previews_after_ready() {
        let broker = Broker::new();
        let ctx = ContentContext { url_path: "/news", file_root: "latest", broker: &broker };
        let contribution = LatestProcessor.process(&ctx, b"/blog:1").unwrap();

        let mut ns = Namespace::new();
        for (name, function) in contribution.functions {
            ns.register_function(name, function);
        }
        ns.define("latest", contribution.body);
        let tera = ns.compile().unwrap();

        // nothing before the broker is ready
        let out = tera.render("latest", &tera::Context::new()).unwrap();
        assert_eq!(out, "");

        broker.publish(
            "/blog",
            json!([
                {"anchor": "b", "date": "2024-02-01", "title": "Second", "url": "/blog/b"},
                {"anchor": "a", "date": "2024-01-01", "title": "First", "url": "/blog/a"},
            ]),
        );
        broker.ready();

        let out = tera.render("latest", &tera::Context::new()).unwrap();
        assert!(out.contains(r#"<a href="/blog/b">2024-02-01 Second</a>"#));
        assert!(!out.contains("First"));
    }
}
