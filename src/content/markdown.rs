//! CommonMark content.

use std::sync::LazyLock;

use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

use super::{ContentContext, ContentError, ContentProcessor, Contribution};
use crate::content::HtmlProcessor;

/// `{name}` embeds the template `name`.
static SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z-]{1,32})\}").expect("shorthand pattern is valid"));

/// Renders CommonMark to HTML, expands `{name}` shorthands into template
/// includes and then treats the result like an HTML template.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownProcessor {
    options: Options,
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_FOOTNOTES,
        }
    }
}

impl MarkdownProcessor {
    pub fn render(&self, markdown: &str) -> String {
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(markdown, self.options));
        SHORTHAND
            .replace_all(&out, r#"{% include "${1}" ignore missing %}"#)
            .into_owned()
    }
}

impl ContentProcessor for MarkdownProcessor {
    fn process(&self, ctx: &ContentContext<'_>, content: &[u8]) -> Result<Contribution, ContentError> {
        let markdown = std::str::from_utf8(content)?;
        Ok(Contribution::body(HtmlProcessor::wrap(
            ctx.url_path,
            &self.render(markdown),
        )))
    }
}
