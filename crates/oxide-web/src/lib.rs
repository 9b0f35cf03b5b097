//! # oxide-web
//!
//! Radix-tree URL routing with handler chains and pooled request contexts.
//!
//! This crate provides:
//! - One radix tree per HTTP method, with `:param` and `*wildcard` segments
//! - Handler chains with `next` and `abort`, built once per route
//! - Blueprints grouping routes under a prefix with shared middleware
//! - A dispatch loop that recycles contexts and turns handler panics into 500s
//!
//! Transport is out of scope: [`App::dispatch`] takes a [`Request`] and
//! returns a [`Response`]. The `oxide-serve` crate puts it behind hyper.
//!
//! ## Quick Start
//!
//! ```
//! use oxide_web::{Engine, Request};
//!
//! let app = Engine::new()
//!     .get("/", |ctx| ctx.string("Hello, World!"))
//!     .get("/users/:id", |ctx| {
//!         let id = ctx.param("id").unwrap_or("unknown").to_string();
//!         ctx.json(&serde_json::json!({ "id": id })).ok();
//!     })
//!     .build()
//!     .unwrap();
//!
//! let response = app.dispatch(Request::get("/users/123"));
//! assert_eq!(response.body, br#"{"id":"123"}"#);
//! ```
//!
//! ## Path Patterns
//!
//! - `/users` matches literally.
//! - `/users/:id` captures one non-empty segment.
//! - `/files/*path` captures the rest of the path, slashes included.
//!
//! Literal routes win over parameters, which win over wildcards. A request
//! that fails further down a literal branch falls back to the parameter or
//! wildcard alternatives.
//!
//! ## Handler Chains
//!
//! A route's chain is its interceptors, then the middleware of every
//! enclosing blueprint, then its own handlers. Middleware calls
//! [`Context::next`] to wrap the rest of the chain; any handler can stop it
//! with [`Context::abort`], which runs the current [`Exit`] action.
//!
//! ```
//! use oxide_web::{Blueprint, Engine, Request};
//!
//! let admin = Blueprint::new("/admin")
//!     .middleware(|ctx| {
//!         if ctx.header("Authorization").is_none() {
//!             ctx.abort_with_string(401, "unauthorized");
//!         }
//!     })
//!     .get("/stats", |ctx| ctx.string("42"));
//!
//! let app = Engine::new().mount(admin).build().unwrap();
//! assert_eq!(app.dispatch(Request::get("/admin/stats")).status, 401);
//! ```

mod app;
mod auth;
mod blueprint;
mod config;
mod context;
mod engine;
mod error;
mod exit;
mod handler;
pub mod middleware;
mod params;
mod path;
mod pool;
mod request;
mod response;
mod router;
mod starter;
mod tree;

pub use app::{App, RouteInfo};
pub use auth::{Authenticator, Authenticators};
pub use blueprint::Blueprint;
pub use config::{EngineConfig, DEFAULT_POOL_CAPACITY};
pub use context::Context;
pub use engine::Engine;
pub use error::{AuthError, BuildError, ContextError, Result, RouteError};
pub use exit::{Exit, Silent, Status};
pub use handler::{handler, Fault, FaultHandler, Handler, HandlerChain};
pub use params::{Param, Params};
pub use path::{PathPattern, PathSegment};
pub use pool::ContextPool;
pub use request::{Method, Request};
pub use response::{body_allowed_for_status, Response, ResponseWriter};
pub use router::{Match, Router};
pub use starter::{BannerStarter, RouteInfoStarter, StartError, Starter};

pub use cookie;
