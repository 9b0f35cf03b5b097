//! Route registration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::App;
use crate::blueprint::Blueprint;
use crate::config::EngineConfig;
use crate::context::{Context, Shared};
use crate::error::BuildError;
use crate::exit::{Exit, Silent};
use crate::handler::{handler, Fault, FaultHandler, Handler, HandlerChain};
use crate::middleware;
use crate::path::PathPattern;
use crate::pool::ContextPool;
use crate::request::Method;
use crate::router::Router;
use crate::starter::Starter;

/// Collects routes and settings, then builds an immutable [`App`].
///
/// Registration only happens here; an `App` cannot gain routes once built.
///
/// # Example
///
/// ```
/// use oxide_web::{Engine, Request};
///
/// let app = Engine::new()
///     .get("/hello/:name", |ctx| {
///         let greeting = format!("hello {}", ctx.param("name").unwrap_or("?"));
///         ctx.string(greeting);
///     })
///     .build()
///     .unwrap();
///
/// let res = app.dispatch(Request::get("/hello/ada"));
/// assert_eq!(res.status, 200);
/// assert_eq!(res.body, b"hello ada");
/// ```
pub struct Engine {
    config: EngineConfig,
    root: Blueprint,
    interceptors: Vec<Handler>,
    not_found: Handler,
    on_fault: FaultHandler,
    default_exit: Arc<dyn Exit>,
    starters: Vec<Box<dyn Starter>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            root: Blueprint::default(),
            interceptors: Vec::new(),
            not_found: handler(middleware::not_found),
            on_fault: Arc::new(middleware::internal_error),
            default_exit: Arc::new(Silent),
            starters: Vec::new(),
        }
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Adds a handler run first for every request, matched or not.
    #[must_use]
    pub fn interceptor<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.interceptors.push(handler(f));
        self
    }

    /// Adds middleware for every registered route.
    #[must_use]
    pub fn middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.middleware(f);
        self
    }

    /// Adds a GET route.
    #[must_use]
    pub fn get<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.get(path, f);
        self
    }

    /// Adds a POST route.
    #[must_use]
    pub fn post<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.post(path, f);
        self
    }

    /// Adds a PUT route.
    #[must_use]
    pub fn put<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.put(path, f);
        self
    }

    /// Adds a PATCH route.
    #[must_use]
    pub fn patch<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.patch(path, f);
        self
    }

    /// Adds a DELETE route.
    #[must_use]
    pub fn delete<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.delete(path, f);
        self
    }

    /// Adds a route for every method.
    #[must_use]
    pub fn any<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.any(path, f);
        self
    }

    /// Adds a route for a single handler.
    #[must_use]
    pub fn route<F>(mut self, method: Method, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.route(method, path, f);
        self
    }

    /// Adds a route whose chain ends with `handlers`.
    #[must_use]
    pub fn handle(mut self, method: Method, path: &str, handlers: Vec<Handler>) -> Self {
        self.root = self.root.handle(method, path, handlers);
        self
    }

    /// Adds a named route.
    #[must_use]
    pub fn named<F>(mut self, name: &str, method: Method, path: &str, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root = self.root.named(name, method, path, f);
        self
    }

    /// Serves the files of `dir` under `url`.
    #[must_use]
    pub fn static_dir(mut self, url: &str, dir: impl Into<PathBuf>) -> Self {
        self.root = self.root.static_dir(url, dir);
        self
    }

    /// Nests a blueprint under `prefix`.
    #[must_use]
    pub fn include(mut self, prefix: &str, blueprint: Blueprint) -> Self {
        self.root = self.root.include(prefix, blueprint);
        self
    }

    /// Mounts a blueprint at its own prefix.
    #[must_use]
    pub fn mount(self, blueprint: Blueprint) -> Self {
        self.include("", blueprint)
    }

    /// Replaces the handler for unmatched requests.
    #[must_use]
    pub fn not_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.not_found = handler(f);
        self
    }

    /// Replaces the handler that answers after a handler panicked.
    #[must_use]
    pub fn on_fault<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Context, &Fault) + Send + Sync + 'static,
    {
        self.on_fault = Arc::new(f);
        self
    }

    /// Sets the exit action each request starts with.
    #[must_use]
    pub fn default_exit(mut self, exit: impl Exit + 'static) -> Self {
        self.default_exit = Arc::new(exit);
        self
    }

    /// Adds a starter run once the app is built.
    #[must_use]
    pub fn starter(mut self, starter: impl Starter + 'static) -> Self {
        self.starters.push(Box::new(starter));
        self
    }

    /// Inserts every route and builds the app.
    ///
    /// Each chain is computed here once: interceptors, then blueprint
    /// middleware from the outermost group inwards, then the route's own
    /// handlers.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Route`] for the first route that cannot be
    /// registered and [`BuildError::Starter`] if a starter fails.
    pub fn build(self) -> Result<App, BuildError> {
        let Self {
            config,
            root,
            interceptors,
            not_found,
            on_fault,
            default_exit,
            starters,
        } = self;

        let mut router = Router::new();
        let mut names = HashMap::new();
        for route in root.into_routes() {
            let method = route.method;
            let registered = PathPattern::parse(&route.path).and_then(|pattern| {
                let chain: HandlerChain = interceptors
                    .iter()
                    .cloned()
                    .chain(route.handlers)
                    .collect();
                tracing::debug!(%method, path = %route.path, handlers = chain.len(), "registering route");
                router.insert_pattern(method, &pattern, chain)?;
                Ok(pattern)
            });
            let pattern = registered.map_err(|source| {
                tracing::error!(%method, path = %route.path, error = %source, "route registration failed");
                BuildError::Route {
                    method,
                    path: route.path.clone(),
                    source,
                }
            })?;
            if let Some(name) = route.name {
                names.insert(name, pattern);
            }
        }

        let not_found_chain: HandlerChain = interceptors
            .into_iter()
            .chain(std::iter::once(Arc::clone(&not_found)))
            .collect();
        let capacity = config.pool_capacity;
        let shared = Arc::new(Shared {
            config,
            not_found,
            on_fault,
            default_exit,
        });
        let app = App {
            router,
            not_found_chain,
            names,
            pool: ContextPool::new(Arc::clone(&shared), capacity),
            shared,
        };

        for starter in &starters {
            starter.start(&app).map_err(|err| BuildError::Starter {
                name: starter.name().to_string(),
                message: err.to_string(),
            })?;
        }
        Ok(app)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("routes", &self.root)
            .field("interceptors", &self.interceptors.len())
            .field("starters", &self.starters.len())
            .finish_non_exhaustive()
    }
}
