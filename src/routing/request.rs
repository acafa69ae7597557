//! The routing view of an HTTP request.

use std::collections::BTreeMap;

use axum::http::{Method, Uri};
use percent_encoding::percent_decode_str;
use serde::Serialize;

/// Owned request data handed to handlers and templates.
///
/// Only method, path and query are kept; headers and cookies never reach
/// content templates.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Cleaned path, still percent-encoded, always starting with `/`.
    pub path: String,
    /// Decoded path segments.
    pub segments: Vec<String>,
    pub query: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(method: Method, path: &str, query: Option<&str>) -> Self {
        let path = clean_path(path);
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();
        let query = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self {
            method,
            path,
            segments,
            query,
        }
    }

    pub fn from_uri(method: Method, uri: &Uri) -> Self {
        Self::new(method, uri.path(), uri.query())
    }

    /// A synthetic GET, used to probe templates at compile time.
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path, None)
    }

    /// GET and HEAD may fall back to static files.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// What templates get to see as `request`.
    pub fn view(&self) -> RequestView<'_> {
        RequestView {
            method: self.method.as_str(),
            path: &self.path,
            query: &self.query,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestView<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a BTreeMap<String, String>,
}

/// Lexically clean a slash-separated path: collapse repeated slashes,
/// drop `.` segments, resolve `..` against the preceding segment (never
/// above the root) and remove any trailing slash.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}
