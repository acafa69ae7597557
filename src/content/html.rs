//! HTML templates.

use super::{ContentContext, ContentError, ContentProcessor, Contribution};

/// Uses the file content as a template.
///
/// The template variable `dir` holds the url path of the directory the file
/// lives in, so links can be written relative to it. Templates of several
/// directories are executed together, so the value is bound at the top of
/// each file rather than passed in at execution time.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlProcessor;

impl HtmlProcessor {
    pub(crate) fn wrap(url_path: &str, html: &str) -> String {
        format!("{{% set dir = \"{}\" %}}{}", escape_literal(url_path), html)
    }
}

fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl ContentProcessor for HtmlProcessor {
    fn process(&self, ctx: &ContentContext<'_>, content: &[u8]) -> Result<Contribution, ContentError> {
        let html = std::str::from_utf8(content)?;
        Ok(Contribution::body(Self::wrap(ctx.url_path, html)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::namespace::Namespace;
    use crate::pubsub::Broker;

    #[test]
    fn test_dir_variable_is_bound() {
        let broker = Broker::new();
        let ctx = ContentContext { url_path: "/site", file_root: "main", broker: &broker };
        let contribution = HtmlProcessor
            .process(&ctx, br#"<a href="{{ dir }}/x">x</a>"#)
            .unwrap();

        let mut ns = Namespace::new();
        ns.define("main", contribution.body);
        let out = ns.compile().unwrap().render("main", &tera::Context::new()).unwrap();
        assert_eq!(out, r#"<a href="/site/x">x</a>"#);
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let broker = Broker::new();
        let ctx = ContentContext { url_path: "", file_root: "main", broker: &broker };
        assert!(matches!(
            HtmlProcessor.process(&ctx, &[0xff, 0xfe]),
            Err(ContentError::Encoding(_))
        ));
    }
}
