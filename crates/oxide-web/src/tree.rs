//! Radix tree holding the routes registered for one HTTP method.
//!
//! Static text is stored compressed: a node's `segment` is the longest run
//! of literal bytes shared by every route below it. Parameter and wildcard
//! edges live in dedicated slots so a node has at most one of each, and
//! static children of a node never share their first character.

use std::sync::Arc;

use crate::error::{Result, RouteError};
use crate::params::Params;
use crate::path::{PathPattern, PathSegment};

pub(crate) struct Node<T> {
    /// Literal text matched by a static node; empty for dynamic nodes.
    pub(crate) segment: String,
    /// Parameter name bound by a dynamic node; empty for static nodes.
    pub(crate) key: Arc<str>,
    /// Static children, highest priority first.
    pub(crate) children: Vec<Node<T>>,
    pub(crate) param_child: Option<Box<Node<T>>>,
    pub(crate) wildcard_child: Option<Box<Node<T>>>,
    pub(crate) value: Option<T>,
    pub(crate) full_path: Option<String>,
    /// Number of routes registered through this subtree.
    pub(crate) priority: u32,
}

impl<T> Node<T> {
    pub(crate) fn root() -> Self {
        Self::with_segment(String::new(), Arc::from(""))
    }

    fn with_segment(segment: String, key: Arc<str>) -> Self {
        Self {
            segment,
            key,
            children: Vec::new(),
            param_child: None,
            wildcard_child: None,
            value: None,
            full_path: None,
            priority: 0,
        }
    }

    fn dynamic(name: &str) -> Self {
        Self::with_segment(String::new(), Arc::from(name))
    }

    /// Inserts `value` at `pattern`. `self` must be a root.
    pub(crate) fn insert(&mut self, pattern: &PathPattern, value: T) -> Result<()> {
        self.insert_at(pattern, pattern.segments(), 0, value)
    }

    /// Continues an insertion below `self`, whose own segment is already
    /// consumed. When `segments[0]` is a literal, `offset` bytes of it are
    /// consumed too and the remainder is non-empty.
    fn insert_at(
        &mut self,
        pattern: &PathPattern,
        segments: &[PathSegment],
        offset: usize,
        value: T,
    ) -> Result<()> {
        match segments.split_first() {
            None => self.attach(pattern, value)?,
            Some((PathSegment::Literal(text), rest)) => {
                let text = &text[offset..];
                let idx = self.static_child_for(text);

                let (idx, common) = match idx {
                    Some(idx) => {
                        let common = common_prefix(&self.children[idx].segment, text);
                        if common < self.children[idx].segment.len() {
                            self.children[idx].split(common);
                        }
                        (idx, common)
                    }
                    None => {
                        self.children
                            .push(Self::with_segment(text.to_string(), Arc::from("")));
                        (self.children.len() - 1, text.len())
                    }
                };

                if common == text.len() {
                    self.children[idx].insert_at(pattern, rest, 0, value)?;
                } else {
                    self.children[idx].insert_at(pattern, segments, offset + common, value)?;
                }
                self.sort_children();
            }
            Some((PathSegment::Param(name), rest)) => {
                if let Some(existing) = &self.param_child {
                    if existing.key.as_ref() != name.as_str() {
                        return Err(RouteError::ConflictingParam {
                            path: pattern.as_str().to_string(),
                            existing: existing.key.to_string(),
                            new: name.clone(),
                        });
                    }
                }
                self.param_child
                    .get_or_insert_with(|| Box::new(Self::dynamic(name)))
                    .insert_at(pattern, rest, 0, value)?;
            }
            Some((PathSegment::Wildcard(name), rest)) => {
                if let Some(existing) = &self.wildcard_child {
                    if existing.key.as_ref() != name.as_str() {
                        return Err(RouteError::ConflictingWildcard {
                            path: pattern.as_str().to_string(),
                            existing: existing.key.to_string(),
                            new: name.clone(),
                        });
                    }
                }
                self.wildcard_child
                    .get_or_insert_with(|| Box::new(Self::dynamic(name)))
                    .insert_at(pattern, rest, 0, value)?;
            }
        }

        self.priority += 1;
        Ok(())
    }

    fn attach(&mut self, pattern: &PathPattern, value: T) -> Result<()> {
        if self.value.is_some() {
            return Err(RouteError::DuplicateRoute(pattern.as_str().to_string()));
        }
        self.value = Some(value);
        self.full_path = Some(pattern.as_str().to_string());
        Ok(())
    }

    /// Index of the static child starting with the same character as `text`.
    fn static_child_for(&self, text: &str) -> Option<usize> {
        let first = text.chars().next()?;
        self.children.iter().position(|c| c.segment.starts_with(first))
    }

    /// Splits this node so that it keeps `segment[..at]` and everything it
    /// held moves into a single child carrying the rest.
    fn split(&mut self, at: usize) {
        let suffix = self.segment.split_off(at);
        let moved = Self {
            segment: suffix,
            key: Arc::clone(&self.key),
            children: std::mem::take(&mut self.children),
            param_child: self.param_child.take(),
            wildcard_child: self.wildcard_child.take(),
            value: self.value.take(),
            full_path: self.full_path.take(),
            priority: self.priority,
        };
        self.children.push(moved);
    }

    fn sort_children(&mut self) {
        // stable: ties keep insertion order
        self.children.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Finds the node terminating `path`, binding parameters on the way.
    ///
    /// Literal children are tried first, then the parameter child, then the
    /// wildcard child. Parameters bound along a failed branch are dropped.
    pub(crate) fn lookup<'n>(&'n self, path: &str, params: &mut Params) -> Option<&'n Self> {
        if path.is_empty() {
            if self.value.is_some() {
                return Some(self);
            }
        } else {
            if let Some(child) = self
                .children
                .iter()
                .find(|c| path.starts_with(c.segment.as_str()))
            {
                let mark = params.len();
                if let Some(found) = child.lookup(&path[child.segment.len()..], params) {
                    return Some(found);
                }
                params.truncate(mark);
            }

            if let Some(child) = &self.param_child {
                let end = path.find('/').unwrap_or(path.len());
                if end > 0 {
                    let mark = params.len();
                    params.push(Arc::clone(&child.key), &path[..end]);
                    if let Some(found) = child.lookup(&path[end..], params) {
                        return Some(found);
                    }
                    params.truncate(mark);
                }
            }
        }

        match &self.wildcard_child {
            Some(child) if child.value.is_some() => {
                params.push(Arc::clone(&child.key), path);
                Some(child)
            }
            _ => None,
        }
    }

    /// Collects `(full_path, value)` for every route in this subtree.
    pub(crate) fn collect<'n>(&'n self, out: &mut Vec<(&'n str, &'n T)>) {
        if let (Some(path), Some(value)) = (&self.full_path, &self.value) {
            out.push((path.as_str(), value));
        }
        for child in &self.children {
            child.collect(out);
        }
        if let Some(child) = &self.param_child {
            child.collect(out);
        }
        if let Some(child) = &self.wildcard_child {
            child.collect(out);
        }
    }
}

/// Length in bytes of the longest common prefix, on a char boundary.
fn common_prefix(a: &str, b: &str) -> usize {
    let mut n = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while !a.is_char_boundary(n) {
        n -= 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(paths: &[&str]) -> Node<String> {
        let mut root = Node::root();
        for path in paths {
            let pattern = PathPattern::parse(path).unwrap();
            root.insert(&pattern, (*path).to_string()).unwrap();
        }
        root
    }

    fn find<'n>(root: &'n Node<String>, path: &str) -> Option<(&'n str, Params)> {
        let mut params = Params::new();
        root.lookup(path, &mut params)
            .and_then(|n| n.value.as_deref())
            .map(|v| (v, params))
    }

    fn insert_err(root: &mut Node<String>, path: &str) -> RouteError {
        let pattern = PathPattern::parse(path).unwrap();
        root.insert(&pattern, path.to_string()).unwrap_err()
    }

    #[test]
    fn test_static_routes_split_shared_prefixes() {
        let paths = ["/search", "/support", "/s", "/blog", "/", "/blog/post"];
        let root = tree(&paths);

        for path in paths {
            let (value, params) = find(&root, path).unwrap();
            assert_eq!(value, path);
            assert!(params.is_empty());
        }
        assert!(find(&root, "/se").is_none());
        assert!(find(&root, "/searching").is_none());
        assert!(find(&root, "/blog/").is_none());
    }

    #[test]
    fn test_split_node_without_value_does_not_match() {
        let root = tree(&["/users/list", "/users/lookup"]);
        assert!(find(&root, "/users/l").is_none());
        assert!(find(&root, "/users/").is_none());
    }

    #[test]
    fn test_param_capture() {
        let root = tree(&["/users/:id"]);
        let (_, params) = find(&root, "/users/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert!(find(&root, "/users/42/extra").is_none());
        assert!(find(&root, "/users/").is_none());
    }

    #[test]
    fn test_multiple_params_keep_declaration_order() {
        let root = tree(&["/repos/:owner/:repo/issues/:number"]);
        let (_, params) = find(&root, "/repos/rust-lang/rust/issues/1").unwrap();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(
            pairs,
            [("owner", "rust-lang"), ("repo", "rust"), ("number", "1")]
        );
    }

    #[test]
    fn test_wildcard_capture_keeps_slashes() {
        let root = tree(&["/static/*filepath"]);
        let (_, params) = find(&root, "/static/css/a.css").unwrap();
        assert_eq!(params.get("filepath"), Some("css/a.css"));

        let (_, params) = find(&root, "/static/").unwrap();
        assert_eq!(params.get("filepath"), Some(""));
        assert!(find(&root, "/static").is_none());
    }

    #[test]
    fn test_literal_before_param() {
        let root = tree(&["/items/:id", "/items/new"]);
        let (value, params) = find(&root, "/items/new").unwrap();
        assert_eq!(value, "/items/new");
        assert!(params.is_empty());

        let (value, params) = find(&root, "/items/newer").unwrap();
        assert_eq!(value, "/items/:id");
        assert_eq!(params.get("id"), Some("newer"));
    }

    #[test]
    fn test_param_before_wildcard() {
        let root = tree(&["/files/*rest", "/files/:name", "/files/readme"]);
        assert_eq!(find(&root, "/files/readme").unwrap().0, "/files/readme");
        assert_eq!(find(&root, "/files/a.txt").unwrap().0, "/files/:name");

        let (value, params) = find(&root, "/files/a/b.txt").unwrap();
        assert_eq!(value, "/files/*rest");
        assert_eq!(params.get("rest"), Some("a/b.txt"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_backtrack_from_failed_literal_branch() {
        let root = tree(&["/a/b/c", "/a/b/e", "/a/:x/d"]);
        let (value, params) = find(&root, "/a/b/d").unwrap();
        assert_eq!(value, "/a/:x/d");
        assert_eq!(params.get("x"), Some("b"));
    }

    #[test]
    fn test_backtrack_discards_params_of_failed_branch() {
        let root = tree(&["/:a/x", "/*rest"]);
        let (value, params) = find(&root, "/v/y").unwrap();
        assert_eq!(value, "/*rest");
        assert_eq!(params.iter().collect::<Vec<_>>(), [("rest", "v/y")]);
    }

    #[test]
    fn test_duplicate_route() {
        let mut root = tree(&["/users/:id", "/about"]);
        assert_eq!(
            insert_err(&mut root, "/about"),
            RouteError::DuplicateRoute("/about".to_string())
        );
        assert_eq!(
            insert_err(&mut root, "/users/:id"),
            RouteError::DuplicateRoute("/users/:id".to_string())
        );
    }

    #[test]
    fn test_conflicting_dynamic_edges() {
        let mut root = tree(&["/users/:id", "/files/*path"]);
        assert!(matches!(
            insert_err(&mut root, "/users/:name/posts"),
            RouteError::ConflictingParam { existing, new, .. } if existing == "id" && new == "name"
        ));
        assert!(matches!(
            insert_err(&mut root, "/files/*rest"),
            RouteError::ConflictingWildcard { existing, new, .. } if existing == "path" && new == "rest"
        ));
    }

    #[test]
    fn test_same_param_name_is_shared() {
        let root = tree(&["/users/:id", "/users/:id/posts"]);
        assert_eq!(find(&root, "/users/1/posts").unwrap().0, "/users/:id/posts");
        assert_eq!(find(&root, "/users/1").unwrap().0, "/users/:id");
    }

    #[test]
    fn test_priority_counts_routes_and_orders_children() {
        let root = tree(&["/a", "/b/1", "/b/2", "/b/3"]);
        assert_eq!(root.priority, 4);

        let slash = &root.children[0];
        assert_eq!(slash.segment, "/");
        assert_eq!(slash.priority, 4);
        assert_eq!(slash.children[0].segment, "b/");
        assert_eq!(slash.children[0].priority, 3);
        assert_eq!(slash.children[1].segment, "a");
        assert_eq!(slash.children[1].priority, 1);
    }

    #[test]
    fn test_priority_ties_keep_insertion_order() {
        let root = tree(&["/x", "/y", "/z"]);
        let order: Vec<_> = root.children[0]
            .children
            .iter()
            .map(|c| c.segment.as_str())
            .collect();
        assert_eq!(order, ["x", "y", "z"]);
    }

    #[test]
    fn test_failed_insert_keeps_priorities() {
        let mut root = tree(&["/about"]);
        let _ = insert_err(&mut root, "/about");
        assert_eq!(root.priority, 1);
    }

    #[test]
    fn test_multibyte_prefixes() {
        let root = tree(&["/é", "/ê", "/日本", "/日本語"]);
        for path in ["/é", "/ê", "/日本", "/日本語"] {
            assert_eq!(find(&root, path).unwrap().0, path);
        }
        assert!(find(&root, "/日").is_none());
    }

    #[test]
    fn test_collect_lists_every_route() {
        let paths = ["/", "/users/:id", "/users/:id/posts", "/static/*fp"];
        let root = tree(&paths);
        let mut out = Vec::new();
        root.collect(&mut out);
        let mut listed: Vec<_> = out.into_iter().map(|(p, _)| p).collect();
        listed.sort_unstable();
        let mut expected = paths.to_vec();
        expected.sort_unstable();
        assert_eq!(listed, expected);
    }

    #[test]
    fn test_common_prefix_respects_char_boundaries() {
        assert_eq!(common_prefix("é", "ê"), 0);
        assert_eq!(common_prefix("/abc", "/abd"), 3);
        assert_eq!(common_prefix("/", "/x"), 1);
    }
}
