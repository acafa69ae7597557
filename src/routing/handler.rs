//! Handler and handler generator contracts.

use axum::response::Response;
use thiserror::Error;

use crate::compiler::Dir;
use crate::pubsub::Broker;
use crate::routing::RequestContext;

/// What a handler decided about a request.
pub enum Flow {
    /// Keep routing with the remaining path.
    Continue,
    /// The handler produced the full response.
    Stop(Response),
}

impl Flow {
    pub fn is_continue(&self) -> bool {
        matches!(self, Flow::Continue)
    }
}

/// Responds to requests reaching a directory.
///
/// `dir` is the directory the handler is installed on, `remaining` the path
/// segments below it.
pub trait Handler: Send + Sync {
    fn handle(&self, dir: &Dir, remaining: &[String], request: &RequestContext) -> Flow;
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler file is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("invalid handler file: {0}")]
    Invalid(String),

    #[error("template error: {0}")]
    Template(String),
}

/// Builds a directory's handler from a marker file.
///
/// Selected by exact file name or by extension. Runs only after the owning
/// directory's subtree is compiled, so it may inspect `dir.subdirs` and
/// publish data derived from them.
pub trait HandlerGenerator: Send + Sync {
    fn generate(
        &self,
        dir: &Dir,
        file_stem: &str,
        content: &[u8],
        broker: &Broker,
    ) -> Result<Box<dyn Handler>, HandlerError>;
}
