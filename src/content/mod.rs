//! Content processors.
//!
//! # Data Flow
//! ```text
//! file bytes (selected by extension)
//!     → ContentProcessor::process
//!     → Contribution { template body, template functions }
//!     → defined in the directory's namespace under the file stem
//! ```
//!
//! # Design Decisions
//! - Processors are plain values registered in the compiler `Config`,
//!   never ambient state
//! - A failing processor never aborts the pass; the compiler renders an
//!   inline notice in place of the content instead

pub mod html;
pub mod latest;
pub mod markdown;

use thiserror::Error;

use crate::compiler::namespace::TemplateFn;
use crate::pubsub::Broker;

pub use html::HtmlProcessor;
pub use latest::LatestProcessor;
pub use markdown::MarkdownProcessor;

/// What a processor knows about the file it is processing.
pub struct ContentContext<'a> {
    /// Url path of the owning directory, `""` for the root so templates can
    /// append `/` without doubling it.
    pub url_path: &'a str,
    /// File name without extension. Distinguishes several instances of the
    /// same kind of content on one page.
    pub file_root: &'a str,
    pub broker: &'a Broker,
}

/// A template body plus the functions it calls.
#[derive(Default)]
pub struct Contribution {
    pub body: String,
    pub functions: Vec<(String, TemplateFn)>,
}

impl Contribution {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            functions: Vec::new(),
        }
    }

    pub fn with_function(mut self, name: impl Into<String>, function: TemplateFn) -> Self {
        self.functions.push((name.into(), function));
        self
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("invalid content: {0}")]
    Invalid(String),
}

/// Turns the bytes of one content file into a template contribution.
///
/// Must be idempotent within a compile pass and must not block
/// indefinitely. May subscribe or publish on the broker.
pub trait ContentProcessor: Send + Sync {
    fn process(&self, ctx: &ContentContext<'_>, content: &[u8]) -> Result<Contribution, ContentError>;
}
