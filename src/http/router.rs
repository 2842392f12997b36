//! Handler registration and lookup.
//!
//! Three tables are consulted in order: exact path, root path plus request
//! Content-Type, then the longest matching path prefix. Lookups read an
//! immutable snapshot; registration swaps in an updated copy.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures::future::BoxFuture;

use crate::http::exchange::Exchange;
use crate::http::request::Request;
use crate::http::response::StatusCode;

/// Future returned by [`Handler::handle`].
pub type HandlerFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// Serves one request by producing its response through the exchange.
pub trait Handler: Send + Sync + 'static {
    fn handle<'a>(&'a self, exchange: &'a mut Exchange<'_>) -> HandlerFuture<'a>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub type SharedHandler = Arc<dyn Handler>;

#[derive(Clone, Default)]
struct RouteTable {
    exact: HashMap<String, SharedHandler>,
    prefix: HashMap<String, SharedHandler>,
    content_type: HashMap<String, SharedHandler>,
}

impl RouteTable {
    fn resolve(&self, request: &Request) -> Option<SharedHandler> {
        let path = request.path();

        if let Some(h) = self.exact.get(path) {
            return Some(h.clone());
        }

        if path == "/" {
            if let Some(ct) = request.content_type() {
                if let Some(h) = self.content_type.get(&ct.to_ascii_lowercase()) {
                    return Some(h.clone());
                }
            }
        }

        self.prefix
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, h)| h.clone())
    }
}

/// Concurrent handler registry.
pub struct Router {
    table: ArcSwap<RouteTable>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
        }
    }

    /// Registers a handler for an exact request path.
    pub fn add_handler(&self, path: impl Into<String>, handler: impl Handler) {
        let path = path.into();
        let handler: SharedHandler = Arc::new(handler);
        self.update(|t| {
            t.exact.insert(path.clone(), handler.clone());
        });
    }

    /// Registers a handler for every path starting with `prefix`.
    pub fn add_prefix_handler(&self, prefix: impl Into<String>, handler: impl Handler) {
        let prefix = prefix.into();
        let handler: SharedHandler = Arc::new(handler);
        self.update(|t| {
            t.prefix.insert(prefix.clone(), handler.clone());
        });
    }

    /// Registers a handler for requests to `/` carrying the given media
    /// type (matched without parameters, ignoring case).
    pub fn add_content_type_handler(&self, content_type: impl AsRef<str>, handler: impl Handler) {
        let content_type = content_type.as_ref().to_ascii_lowercase();
        let handler: SharedHandler = Arc::new(handler);
        self.update(|t| {
            t.content_type.insert(content_type.clone(), handler.clone());
        });
    }

    pub fn remove_handler(&self, path: &str) -> bool {
        self.remove(|t| t.exact.remove(path).is_some())
    }

    pub fn remove_prefix_handler(&self, prefix: &str) -> bool {
        self.remove(|t| t.prefix.remove(prefix).is_some())
    }

    pub fn remove_content_type_handler(&self, content_type: &str) -> bool {
        let key = content_type.to_ascii_lowercase();
        self.remove(|t| t.content_type.remove(&key).is_some())
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.table.store(Arc::new(RouteTable::default()));
    }

    /// Finds the handler for a request, if any.
    pub fn resolve(&self, request: &Request) -> Option<SharedHandler> {
        self.table.load().resolve(request)
    }

    fn update(&self, f: impl Fn(&mut RouteTable)) {
        self.table.rcu(|current| {
            let mut next = RouteTable::clone(current);
            f(&mut next);
            next
        });
    }

    fn remove(&self, f: impl Fn(&mut RouteTable) -> bool) -> bool {
        let mut removed = false;
        self.table.rcu(|current| {
            let mut next = RouteTable::clone(current);
            removed = f(&mut next);
            next
        });
        removed
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers 404 with a fixed body; used when nothing matches.
pub struct NotFound;

impl Handler for NotFound {
    fn handle<'a>(&'a self, exchange: &'a mut Exchange<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut response = exchange.begin(StatusCode::NotFound).await?;
            response.set_content_type("text/plain")?;
            response.send(b"404 Not Found").await?;
            Ok(())
        })
    }
}
