//! `blog` marker files.
//!
//! Subdirectories whose name starts with an ISO date are posts. The
//! generator collects a preview of each post, publishes the list under the
//! blog's url path (see `LatestProcessor`) and renders it on the blog page.
//! Each post is rendered with its date and a link back to its entry in
//! the list.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compiler::namespace::{escape_html, ROOT_TEMPLATE};
use crate::compiler::slug::slugify;
use crate::compiler::Dir;
use crate::pubsub::Broker;
use crate::routing::template::{Entry, TemplateHandler};
use crate::routing::{Flow, Handler, HandlerError, HandlerGenerator, RequestContext};

static POST_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})").expect("valid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-4][^>]*>(.*?)</h[1-4]>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Template listing the posts.
pub const POSTS_TEMPLATE: &str = "posts";
const MAIN_TEMPLATE: &str = "main";
const POST_TEMPLATE: &str = "post";

const POSTS_BODY: &str = concat!(
    r#"<ul class="posts">{% for post in posts %}"#,
    r#"<li id="{{ post.anchor }}"><a href="{{ post.url }}">{{ post.date }} {{ post.title | safe }}</a></li>"#,
    "{% endfor %}</ul>"
);

const POST_BODY: &str = concat!(
    r#"<p><a href="{{ back_url }}">Back to Blog</a></p>"#,
    "<p>{{ date }}</p>",
    r#"{% include "post" %}"#
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPreview {
    pub anchor: String,
    pub date: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BlogGenerator;

impl HandlerGenerator for BlogGenerator {
    fn generate(
        &self,
        dir: &Dir,
        _file_stem: &str,
        _content: &[u8],
        broker: &Broker,
    ) -> Result<Box<dyn Handler>, HandlerError> {
        let posts = previews(dir);
        tracing::debug!(url_path = %dir.url_path, posts = posts.len(), "Collected blog posts");

        let value = serde_json::to_value(&posts).map_err(|e| HandlerError::Invalid(e.to_string()))?;
        broker.publish(&dir.url_path, value.clone());

        let mut namespace = dir.namespace.clone();
        namespace.define(POSTS_TEMPLATE, POSTS_BODY);
        if !dir.own_templates.iter().any(|name| name == MAIN_TEMPLATE) {
            namespace.define(MAIN_TEMPLATE, POSTS_BODY);
        }
        let entry = if namespace.contains(ROOT_TEMPLATE) {
            Entry::Named(ROOT_TEMPLATE.to_string())
        } else {
            Entry::Named(POSTS_TEMPLATE.to_string())
        };
        let index = TemplateHandler::new(&namespace, entry)?.with_variable("posts", value);

        // anchors are the slugs the posts are stored under
        let mut pages = HashMap::new();
        for preview in &posts {
            let Some(post) = dir.subdirs.get(&preview.anchor) else {
                continue;
            };
            match post_page(dir, post, preview) {
                Ok(page) => {
                    pages.insert(preview.anchor.clone(), page);
                }
                Err(e) => tracing::warn!(
                    url_path = %post.url_path,
                    error = %e,
                    "No post page, serving the post directory as is"
                ),
            }
        }

        Ok(Box::new(BlogHandler { index, pages }))
    }
}

/// Renders the list on the blog itself and the post page one level below.
pub struct BlogHandler {
    index: TemplateHandler,
    pages: HashMap<String, TemplateHandler>,
}

impl Handler for BlogHandler {
    fn handle(&self, dir: &Dir, remaining: &[String], request: &RequestContext) -> Flow {
        match remaining {
            [] => self.index.handle(dir, remaining, request),
            [slug] => match (self.pages.get(slug), dir.subdirs.get(slug)) {
                (Some(page), Some(post)) => page.handle(post, &[], request),
                _ => Flow::Continue,
            },
            _ => Flow::Continue,
        }
    }
}

/// The post's own content wrapped in a back link and its date.
fn post_page(blog: &Dir, post: &Dir, preview: &PostPreview) -> Result<TemplateHandler, HandlerError> {
    let body: String = post
        .own_templates
        .iter()
        .filter(|name| name.as_str() != ROOT_TEMPLATE)
        .filter_map(|name| post.namespace.lookup(name))
        .collect();

    let mut namespace = post.namespace.clone();
    namespace.define(POST_TEMPLATE, body);
    namespace.define(MAIN_TEMPLATE, POST_BODY);
    let entry = if namespace.contains(ROOT_TEMPLATE) {
        Entry::Named(ROOT_TEMPLATE.to_string())
    } else {
        Entry::Named(MAIN_TEMPLATE.to_string())
    };

    Ok(TemplateHandler::new(&namespace, entry)?
        .with_variable("back_url", Value::from(format!("{}#{}", blog.url_path, preview.anchor)))
        .with_variable("date", Value::from(preview.date.clone())))
}

/// Previews of every dated subdirectory, newest first.
pub fn previews(dir: &Dir) -> Vec<PostPreview> {
    let mut posts: Vec<PostPreview> = dir
        .subdirs
        .values()
        .filter_map(|post| {
            let date = POST_DATE.captures(&post.name)?.get(1)?.as_str().to_string();
            Some(PostPreview {
                anchor: slugify(&post.name),
                date,
                title: title(post).unwrap_or_else(|| escape_html(&post.name)),
                url: post.url_path.clone(),
            })
        })
        .collect();
    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.anchor.cmp(&a.anchor)));
    posts
}

fn title(post: &Dir) -> Option<String> {
    post.own_templates.iter().find_map(|name| {
        let body = post.namespace.lookup(name)?;
        let heading = HEADING.captures(body)?.get(1)?.as_str();
        let text = TAG.replace_all(heading, "");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}
