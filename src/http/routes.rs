//! The HTTP routing table.
//!
//! Paths follow the classic mux rules: a path ending in `/` also matches its
//! whole subtree, any other path matches exactly, and `/` catches everything
//! no other entry claims.
//!
//! Paths are literal: they carry no captures or wildcards of their own.

use axum::routing::MethodRouter;
use axum::Router;
use thiserror::Error;

/// A path rejected by [`HttpRoutes::route`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("route path {0:?} is already registered")]
    Duplicate(String),
}

/// Path → handler mappings collected before the server is launched.
#[derive(Debug, Default)]
pub struct HttpRoutes {
    entries: Vec<(String, MethodRouter)>,
}

impl HttpRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `path`.
    ///
    /// Every accepted table builds a router without panicking, so a path
    /// must start with `/`, contain no empty segment, and use none of the
    /// router's capture syntax (`{..}`, `:name`, `*name`). Each path may be
    /// registered once.
    pub fn route(
        mut self,
        path: impl Into<String>,
        handler: MethodRouter,
    ) -> Result<Self, RouteError> {
        let path = path.into();
        check_path(&path)?;
        if self.entries.iter().any(|(existing, _)| *existing == path) {
            return Err(RouteError::Duplicate(path));
        }

        self.entries.push((path, handler));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the single routing table.
    pub fn into_router(self) -> Router {
        let mut router = Router::new();

        for (path, handler) in self.entries {
            router = if path == "/" {
                router.fallback_service(handler)
            } else if let Some(prefix) = path.strip_suffix('/') {
                router
                    .route(&path, handler.clone())
                    .route(&format!("{}/{{*rest}}", prefix), handler)
            } else {
                router.route(&path, handler)
            };
        }

        router
    }
}

fn check_path(path: &str) -> Result<(), RouteError> {
    let invalid = |reason| {
        Err(RouteError::InvalidPath {
            path: path.to_string(),
            reason,
        })
    };

    if !path.starts_with('/') {
        return invalid("must start with '/'");
    }
    if path.contains(['{', '}']) {
        return invalid("braces are not allowed");
    }

    let segments: Vec<&str> = path[1..].split('/').collect();
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        // A trailing empty segment is the subtree marker; "/" is one empty segment.
        if segment.is_empty() && i != last {
            return invalid("empty path segment");
        }
        if segment.starts_with(':') || segment.starts_with('*') {
            return invalid("segments must not start with ':' or '*'");
        }
    }
    Ok(())
}
