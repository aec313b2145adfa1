//! Path-pattern route table.
//!
//! Patterns are slash-separated. A segment starting with `:` captures the
//! matching path segment under that name. Parenthesised groups at the end of
//! a pattern are optional and cumulative:
//!
//! - `/users/:id` matches `/users/42` with `{id: "42"}`
//! - `/users(/:id)(/edit)` matches `/users`, `/users/42` and `/users/42/edit`
//!
//! Query strings and fragments are ignored when matching. Routes are tried in
//! the order they were first mapped; the first match wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{read, write};

/// Parameters captured from `:name` segments.
pub type RouteParams = HashMap<String, String>;

type RouteHandler = Arc<dyn Fn(&RouteParams) + Send + Sync>;
type RescueHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    pattern: String,
    /// Every accepted shape of the pattern, shortest first.
    variants: Vec<Vec<Segment>>,
    handler: RouteHandler,
}

/// A resolved route, ready to run.
#[derive(Clone)]
pub struct RouteMatch {
    pattern: String,
    params: RouteParams,
    handler: RouteHandler,
}

impl RouteMatch {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Invokes the bound handler with the captured parameters.
    pub fn run(&self) {
        (self.handler)(&self.params);
    }
}

/// Shared table of path patterns and their handlers.
///
/// Cloning is cheap; clones share the same table.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Arc<RwLock<Vec<Route>>>,
    rescue: Arc<RwLock<Option<RescueHandler>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `pattern`. Mapping an existing pattern again replaces
    /// its handler but keeps its position.
    pub fn map(&self, pattern: &str, handler: impl Fn(&RouteParams) + Send + Sync + 'static) {
        let handler: RouteHandler = Arc::new(handler);
        let mut routes = write(&self.routes);
        if let Some(route) = routes.iter_mut().find(|r| r.pattern == pattern) {
            route.handler = handler;
            return;
        }
        routes.push(Route {
            pattern: pattern.to_string(),
            variants: partition(pattern),
            handler,
        });
    }

    /// Handler invoked by [`dispatch`](Self::dispatch) when nothing matches.
    pub fn set_rescue(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        *write(&self.rescue) = Some(Arc::new(handler));
    }

    /// Resolves `path` without running anything.
    pub fn find(&self, path: &str) -> Option<RouteMatch> {
        let path = strip_query(path);
        let routes = read(&self.routes);
        routes.iter().find_map(|route| {
            route
                .variants
                .iter()
                .find_map(|variant| match_variant(variant, path))
                .map(|params| RouteMatch {
                    pattern: route.pattern.clone(),
                    params,
                    handler: route.handler.clone(),
                })
        })
    }

    /// Resolves `path` and runs the bound handler, or the rescue handler when
    /// nothing matches. Returns whether a route matched.
    pub fn dispatch(&self, path: &str) -> bool {
        // Resolve first so the handler runs without the table locked.
        match self.find(path) {
            Some(matched) => {
                matched.run();
                true
            }
            None => {
                let rescue = read(&self.rescue).clone();
                if let Some(rescue) = rescue {
                    rescue(path);
                }
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        read(&self.routes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn parse_segments(path: &str) -> Vec<Segment> {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(segment.to_string()),
        })
        .collect()
}

/// Expands optional groups: `/a(/b)(/c)` -> `/a`, `/a/b`, `/a/b/c`.
///
/// Groups may nest; `/a(/b(/c))` expands the same way. Every `(` closes the
/// variant before it.
fn partition(pattern: &str) -> Vec<Vec<Segment>> {
    let mut shapes = Vec::new();
    let mut current = String::new();
    for ch in pattern.chars() {
        match ch {
            '(' => shapes.push(current.clone()),
            ')' => {}
            other => current.push(other),
        }
    }
    shapes.push(current);
    shapes.dedup();

    shapes.iter().map(|shape| parse_segments(shape)).collect()
}

fn match_variant(variant: &[Segment], path: &str) -> Option<RouteParams> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() != variant.len() {
        return None;
    }

    let mut params = RouteParams::new();
    for (segment, part) in variant.iter().zip(parts) {
        match segment {
            Segment::Literal(literal) if literal == part => {}
            Segment::Param(name) if !part.is_empty() => {
                params.insert(name.clone(), part.to_string());
            }
            _ => return None,
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<RouteParams>>>, impl Fn(&RouteParams) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |params: &RouteParams| sink.lock().unwrap().push(params.clone()))
    }

    #[test]
    fn test_param_capture() {
        let table = RouteTable::new();
        let (seen, handler) = recorder();
        table.map("/users/:id", handler);

        assert!(table.dispatch("/users/42"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_unmatched_runs_nothing() {
        let table = RouteTable::new();
        let (seen, handler) = recorder();
        table.map("/users/:id", handler);

        assert!(!table.dispatch("/users"));
        assert!(!table.dispatch("/users/42/edit"));
        assert!(!table.dispatch("/orders/42"));
        assert!(!table.dispatch("/users/"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_optional_groups() {
        let table = RouteTable::new();
        table.map("/users(/:id)(/edit)", |_| {});

        assert!(table.find("/users").unwrap().params().is_empty());
        assert_eq!(table.find("/users/7").unwrap().params()["id"], "7");
        assert_eq!(table.find("/users/7/edit").unwrap().params()["id"], "7");
        assert!(table.find("/users/7/view").is_none());
    }

    #[test]
    fn test_nested_optional_groups() {
        let table = RouteTable::new();
        table.map("/users(/:id(/edit))", |_| {});

        assert!(table.find("/users").unwrap().params().is_empty());
        assert_eq!(table.find("/users/7").unwrap().params()["id"], "7");
        assert_eq!(table.find("/users/7/edit").unwrap().params()["id"], "7");
        assert!(table.find("/users/7/view").is_none());
        assert!(table.find("/users/edit").is_some_and(|m| m.params()["id"] == "edit"));
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        let table = RouteTable::new();
        table.map("/search/:term", |_| {});

        let matched = table.find("/search/rust?page=2#top").unwrap();
        assert_eq!(matched.params()["term"], "rust");
        assert_eq!(matched.pattern(), "/search/:term");
    }

    #[test]
    fn test_first_mapped_route_wins() {
        let table = RouteTable::new();
        table.map("/items/:id", |_| {});
        table.map("/items/new", |_| {});

        assert_eq!(table.find("/items/new").unwrap().pattern(), "/items/:id");
    }

    #[test]
    fn test_remap_replaces_handler() {
        let table = RouteTable::new();
        let (first, h1) = recorder();
        let (second, h2) = recorder();
        table.map("/home", h1);
        table.map("/home", h2);

        assert_eq!(table.len(), 1);
        table.dispatch("/home");
        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rescue_on_miss() {
        let table = RouteTable::new();
        let missed = Arc::new(Mutex::new(Vec::new()));
        let sink = missed.clone();
        table.set_rescue(move |path| sink.lock().unwrap().push(path.to_string()));

        assert!(!table.dispatch("/nowhere"));
        assert_eq!(*missed.lock().unwrap(), vec!["/nowhere".to_string()]);
    }
}
