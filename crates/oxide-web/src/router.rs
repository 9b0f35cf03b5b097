//! Per-method routing tables.

use std::collections::HashMap;

use crate::error::Result;
use crate::params::Params;
use crate::path::PathPattern;
use crate::request::Method;
use crate::tree::Node;

/// A successful route match.
#[derive(Debug)]
pub struct Match<'r, T> {
    /// The value registered for the route.
    pub value: &'r T,
    /// Captured path parameters, in declaration order.
    pub params: Params,
    /// The pattern the route was registered with.
    pub route: &'r str,
}

/// Maps `(method, path)` to registered values through one radix tree per
/// HTTP method.
///
/// A router is filled during startup and only read afterwards; it has no
/// interior mutability, so sharing it behind an `Arc` while serving is safe
/// and inserting while serving is impossible.
pub struct Router<T> {
    trees: HashMap<Method, Node<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }

    /// Registers `value` for `method` and `path`.
    ///
    /// # Errors
    ///
    /// Fails when the path is malformed, already registered for this method,
    /// or declares a parameter or wildcard that conflicts with an existing
    /// one at the same position.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_web::{Method, Router};
    ///
    /// let mut router = Router::new();
    /// router.insert(Method::Get, "/users/:id", "user").unwrap();
    ///
    /// let found = router.find(Method::Get, "/users/42").unwrap();
    /// assert_eq!(*found.value, "user");
    /// assert_eq!(found.params.get("id"), Some("42"));
    /// assert!(router.insert(Method::Get, "/users/:id", "again").is_err());
    /// ```
    pub fn insert(&mut self, method: Method, path: &str, value: T) -> Result<()> {
        let pattern = PathPattern::parse(path)?;
        self.insert_pattern(method, &pattern, value)
    }

    /// Registers `value` for an already parsed pattern.
    ///
    /// # Errors
    ///
    /// Same as [`Router::insert`], minus pattern syntax errors.
    pub fn insert_pattern(&mut self, method: Method, pattern: &PathPattern, value: T) -> Result<()> {
        self.trees
            .entry(method)
            .or_insert_with(Node::root)
            .insert(pattern, value)
    }

    /// Looks up `path`, appending captured parameters to `params`.
    ///
    /// `params` is left as it was when nothing matches.
    pub fn lookup<'r>(&'r self, method: Method, path: &str, params: &mut Params) -> Option<&'r T> {
        let root = self.trees.get(&method)?;
        let mark = params.len();
        let found = root.lookup(path, params).and_then(|node| node.value.as_ref());
        if found.is_none() {
            params.truncate(mark);
        }
        found
    }

    /// Looks up `path` and returns the match with its own parameter set.
    #[must_use]
    pub fn find(&self, method: Method, path: &str) -> Option<Match<'_, T>> {
        let root = self.trees.get(&method)?;
        let mut params = Params::new();
        let node = root.lookup(path, &mut params)?;
        Some(Match {
            value: node.value.as_ref()?,
            params,
            route: node.full_path.as_deref()?,
        })
    }

    /// Every registered route, ordered by method then path.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, &str, &T)> {
        let mut routes = Vec::new();
        for (method, root) in &self.trees {
            let mut collected = Vec::new();
            root.collect(&mut collected);
            routes.extend(collected.into_iter().map(|(path, value)| (*method, path, value)));
        }
        routes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        routes
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.values().map(|root| root.priority as usize).sum()
    }

    /// Returns true when no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> std::fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.routes()
                    .into_iter()
                    .map(|(method, path, _)| format!("{method} {path}")),
            )
            .finish()
    }
}
