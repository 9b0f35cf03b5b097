//! Route groups sharing a prefix and middleware.

use std::path::PathBuf;

use crate::context::Context;
use crate::handler::{handler, Handler};
use crate::middleware::{self, STATIC_PARAM};
use crate::request::Method;

/// A route collected by a blueprint, not yet inserted into a router.
pub(crate) struct RouteDef {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) handlers: Vec<Handler>,
    pub(crate) name: Option<String>,
}

/// A group of routes with a common path prefix and middleware.
///
/// Blueprints nest with [`Blueprint::include`]; the final path and chain of
/// every route are fixed when the owning [`Engine`](crate::Engine) is built.
///
/// # Example
///
/// ```
/// use oxide_web::{Blueprint, Engine, Request};
///
/// let users = Blueprint::new("/users")
///     .middleware(|ctx| ctx.set_header("X-Group", "users"))
///     .get("/:id", |ctx| {
///         let id = ctx.param("id").unwrap_or_default().to_string();
///         ctx.string(id);
///     });
///
/// let app = Engine::new().include("/api", users).build().unwrap();
/// let res = app.dispatch(Request::get("/api/users/7"));
/// assert_eq!(res.body, b"7");
/// assert_eq!(res.get_header("x-group"), Some("users"));
/// ```
#[derive(Default)]
pub struct Blueprint {
    prefix: String,
    middleware: Vec<Handler>,
    routes: Vec<RouteDef>,
}

impl Blueprint {
    /// Creates a blueprint whose routes live under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// The path prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of routes collected so far, nested ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no route was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Adds middleware run before every route of this blueprint.
    ///
    /// Middleware applies to all routes of the blueprint, including routes
    /// added before this call.
    #[must_use]
    pub fn middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.middleware.push(handler(f));
        self
    }

    /// Adds a GET route.
    #[must_use]
    pub fn get<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Get, path, f)
    }

    /// Adds a POST route.
    #[must_use]
    pub fn post<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Post, path, f)
    }

    /// Adds a PUT route.
    #[must_use]
    pub fn put<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Put, path, f)
    }

    /// Adds a PATCH route.
    #[must_use]
    pub fn patch<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Patch, path, f)
    }

    /// Adds a DELETE route.
    #[must_use]
    pub fn delete<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Delete, path, f)
    }

    /// Adds a HEAD route.
    #[must_use]
    pub fn head<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Head, path, f)
    }

    /// Adds an OPTIONS route.
    #[must_use]
    pub fn options<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Options, path, f)
    }

    /// Adds a route for a single handler.
    #[must_use]
    pub fn route<F>(self, method: Method, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(method, path, vec![handler(f)])
    }

    /// Adds a route whose chain ends with `handlers`, in order.
    #[must_use]
    pub fn handle(mut self, method: Method, path: &str, handlers: Vec<Handler>) -> Self {
        self.routes.push(RouteDef {
            method,
            path: path.to_string(),
            handlers,
            name: None,
        });
        self
    }

    /// Adds a route for every method in [`Method::ALL`].
    #[must_use]
    pub fn any<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        let h = handler(f);
        for method in Method::ALL {
            self = self.handle(method, path, vec![h.clone()]);
        }
        self
    }

    /// Adds a route that can be reversed with [`App::url_for`].
    ///
    /// [`App::url_for`]: crate::App::url_for
    #[must_use]
    pub fn named<F>(mut self, name: &str, method: Method, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.routes.push(RouteDef {
            method,
            path: path.to_string(),
            handlers: vec![handler(f)],
            name: Some(name.to_string()),
        });
        self
    }

    /// Serves the files of `dir` under `url` with GET.
    #[must_use]
    pub fn static_dir(self, url: &str, dir: impl Into<PathBuf>) -> Self {
        let base = url.trim_end_matches('/');
        let path = format!("{base}/*{STATIC_PARAM}");
        self.route(Method::Get, &path, middleware::serve_dir(dir))
    }

    /// Nests `child` under `prefix`. The child keeps its own prefix and
    /// middleware, and this blueprint's middleware runs before it.
    #[must_use]
    pub fn include(mut self, prefix: &str, child: Self) -> Self {
        for mut route in child.into_routes() {
            route.path = join(prefix, &route.path);
            self.routes.push(route);
        }
        self
    }

    /// Flattens into routes with the prefix applied and middleware
    /// prepended.
    pub(crate) fn into_routes(self) -> Vec<RouteDef> {
        let Self {
            prefix,
            middleware,
            routes,
        } = self;
        routes
            .into_iter()
            .map(|mut route| {
                route.path = join(&prefix, &route.path);
                if !middleware.is_empty() {
                    let mut handlers = middleware.clone();
                    handlers.append(&mut route.handlers);
                    route.handlers = handlers;
                }
                route
            })
            .collect()
    }
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware.len())
            .field("routes", &self.routes.len())
            .finish()
    }
}

/// Joins a prefix and a path without doubling the separator.
fn join(prefix: &str, path: &str) -> String {
    match (prefix.strip_suffix('/'), path.starts_with('/')) {
        (Some(trimmed), true) => format!("{trimmed}{path}"),
        _ => format!("{prefix}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(bp: Blueprint) -> Vec<(Method, String, usize)> {
        bp.into_routes()
            .into_iter()
            .map(|r| (r.method, r.path, r.handlers.len()))
            .collect()
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/api", "/users"), "/api/users");
        assert_eq!(join("/api/", "/users"), "/api/users");
        assert_eq!(join("", "/users"), "/users");
        assert_eq!(join("/api", ""), "/api");
    }

    #[test]
    fn test_prefix_and_middleware_applied_on_flatten() {
        let bp = Blueprint::new("/admin")
            .get("/users", |_| {})
            .middleware(|_| {})
            .post("/users", |_| {});

        assert_eq!(
            paths(bp),
            [
                (Method::Get, "/admin/users".to_string(), 2),
                (Method::Post, "/admin/users".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_nested_include() {
        let inner = Blueprint::new("/v1").middleware(|_| {}).get("/ping", |_| {});
        let outer = Blueprint::new("/api").middleware(|_| {}).include("/x", inner);

        assert_eq!(paths(outer), [(Method::Get, "/api/x/v1/ping".to_string(), 3)]);
    }

    #[test]
    fn test_any_registers_every_method() {
        let routes = paths(Blueprint::default().any("/hook", |_| {}));
        assert_eq!(routes.len(), Method::ALL.len());
        assert!(routes.iter().all(|(_, path, _)| path == "/hook"));
    }

    #[test]
    fn test_static_dir_route() {
        let routes = paths(Blueprint::default().static_dir("/assets/", "public"));
        assert_eq!(routes, [(Method::Get, "/assets/*static".to_string(), 1)]);
    }

    #[test]
    fn test_named_routes_keep_names() {
        let bp = Blueprint::new("/blog").named("post", Method::Get, "/:slug", |_| {});
        let route = bp.into_routes().pop().unwrap();
        assert_eq!(route.name.as_deref(), Some("post"));
        assert_eq!(route.path, "/blog/:slug");
    }
}
