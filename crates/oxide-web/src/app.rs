//! Built application and request dispatch.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::context::{Context, Shared};
use crate::handler::{Fault, HandlerChain};
use crate::path::PathPattern;
use crate::pool::ContextPool;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::router::Router;

/// A registered route, as reported by [`App::routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Route method.
    pub method: Method,
    /// Route pattern.
    pub path: String,
    /// Length of the route's handler chain.
    pub handlers: usize,
}

/// An immutable, shareable application ready to serve requests.
///
/// Built by [`Engine::build`](crate::Engine::build). `dispatch` takes
/// `&self`, so one `App` behind an `Arc` serves any number of threads.
pub struct App {
    pub(crate) router: Router<HandlerChain>,
    pub(crate) not_found_chain: HandlerChain,
    pub(crate) names: HashMap<String, PathPattern>,
    pub(crate) pool: ContextPool,
    pub(crate) shared: Arc<Shared>,
}

impl App {
    /// Serves one request.
    ///
    /// A panicking handler never escapes this call: the fault is logged and
    /// answered by the fault handler, 500 by default.
    pub fn dispatch(&self, request: Request) -> Response {
        let mut ctx = self.pool.acquire();
        ctx.request = request;

        let chain = self
            .router
            .lookup(ctx.request.method, &ctx.request.path, &mut ctx.params)
            .cloned();
        ctx.matched = chain.is_some();
        ctx.chain = chain.unwrap_or_else(|| Arc::clone(&self.not_found_chain));

        self.run(&mut ctx);

        let response = ctx.response.take();
        self.pool.release(ctx);
        response
    }

    fn run(&self, ctx: &mut Context) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| ctx.next()));
        let Err(payload) = outcome else {
            return;
        };

        let fault = Fault::from_panic(payload.as_ref());
        tracing::error!(
            method = %ctx.request.method,
            path = %ctx.request.path,
            handler = ?ctx.current,
            error = %fault,
            "handler panicked"
        );

        ctx.response.clear();
        let on_fault = Arc::clone(&self.shared.on_fault);
        if panic::catch_unwind(AssertUnwindSafe(|| on_fault(ctx, &fault))).is_err() {
            tracing::error!(path = %ctx.request.path, "fault handler panicked");
            ctx.response.clear();
            ctx.response.set_status(500);
        }
    }

    /// Builds the URL of a named route.
    ///
    /// Returns `None` for an unknown name or a missing parameter.
    #[must_use]
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Option<String> {
        self.names.get(name)?.reverse(params)
    }

    /// Every registered route, ordered by method then path.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.router
            .routes()
            .into_iter()
            .map(|(method, path, chain)| RouteInfo {
                method,
                path: path.to_string(),
                handlers: chain.len(),
            })
            .collect()
    }

    /// The routing table.
    #[must_use]
    pub const fn router(&self) -> &Router<HandlerChain> {
        &self.router
    }

    /// App configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Number of pooled idle contexts.
    #[must_use]
    pub fn idle_contexts(&self) -> usize {
        self.pool.idle()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("config", self.config())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
