//! `redirect` marker files.
//!
//! The trimmed file content is the target. Absolute URLs and paths starting
//! with `/` are used as is; anything else is resolved below the request path.

use axum::response::{IntoResponse, Redirect};

use crate::compiler::Dir;
use crate::pubsub::Broker;
use crate::routing::request::clean_path;
use crate::routing::{Flow, Handler, HandlerError, HandlerGenerator, RequestContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct RedirectGenerator;

impl HandlerGenerator for RedirectGenerator {
    fn generate(
        &self,
        _dir: &Dir,
        _file_stem: &str,
        content: &[u8],
        _broker: &Broker,
    ) -> Result<Box<dyn Handler>, HandlerError> {
        let target = std::str::from_utf8(content)?.trim();
        if target.is_empty() {
            return Err(HandlerError::Invalid("empty redirect target".into()));
        }
        Ok(Box::new(RedirectHandler::new(target)))
    }
}

#[derive(Debug, Clone)]
pub struct RedirectHandler {
    target: String,
    relative: bool,
}

impl RedirectHandler {
    pub fn new(target: &str) -> Self {
        let relative = !target.starts_with('/') && url::Url::parse(target).is_err();
        Self {
            target: target.to_string(),
            relative,
        }
    }

    fn location(&self, request: &RequestContext) -> String {
        if self.relative {
            clean_path(&format!("{}/{}", request.path, self.target))
        } else {
            self.target.clone()
        }
    }
}

impl Handler for RedirectHandler {
    fn handle(&self, _dir: &Dir, remaining: &[String], request: &RequestContext) -> Flow {
        // only the directory itself redirects; files below it stay reachable
        if !remaining.is_empty() {
            return Flow::Continue;
        }
        Flow::Stop(Redirect::to(&self.location(request)).into_response())
    }
}
