//! Built-in handlers and middleware.
//!
//! Everything here returns a plain closure, so it can be passed anywhere a
//! handler is accepted:
//!
//! ```
//! use oxide_web::{middleware, Engine, Method};
//!
//! let app = Engine::new()
//!     .interceptor(middleware::logger())
//!     .middleware(middleware::allow_options(&[Method::Get, Method::Post]))
//!     .get("/ping", |ctx| ctx.string("pong"))
//!     .build()
//!     .unwrap();
//! # let _ = app;
//! ```

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::auth::Authenticators;
use crate::context::Context;
use crate::error::AuthError;
use crate::exit::{Exit, Silent};
use crate::handler::Fault;
use crate::request::Method;

/// Name of the wildcard parameter used by [`serve_dir`] routes.
pub const STATIC_PARAM: &str = "static";

/// Default not-found handler: 404 with a short plain-text body.
pub fn not_found(ctx: &mut Context) {
    ctx.set_status(404);
    ctx.string("Not Found");
}

/// Default fault handler: 500, with the panic message in debug mode.
pub fn internal_error(ctx: &mut Context, fault: &Fault) {
    ctx.set_status(500);
    if ctx.config().debug {
        ctx.string(format!("Internal Server Error\n\n{fault}"));
    } else {
        ctx.string("Internal Server Error");
    }
}

/// Logs every request once the rest of the chain has run.
pub fn logger() -> impl Fn(&mut Context) + Send + Sync + 'static {
    |ctx: &mut Context| {
        let start = Instant::now();
        ctx.next();
        tracing::info!(
            method = %ctx.method(),
            path = %ctx.path(),
            matched = ctx.is_matched(),
            status = ctx.response().status().unwrap_or(200),
            aborted = ctx.is_aborted(),
            elapsed = ?start.elapsed(),
            remote = ?ctx.request().remote_addr,
            "request"
        );
    }
}

/// Answers `OPTIONS` requests with `204 No Content` and an `Allow` header
/// listing `methods`, then aborts. Other requests pass through.
pub fn allow_options(methods: &[Method]) -> impl Fn(&mut Context) + Send + Sync + 'static {
    let allow = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    move |ctx: &mut Context| {
        if ctx.method() != Method::Options {
            return;
        }
        ctx.set_header("Allow", allow.clone());
        ctx.set_header("Content-Length", "0");
        ctx.abort_with(|ctx: &mut Context| ctx.set_status(204));
    }
}

/// Compresses response bodies with gzip at `level` (0 to 9) for clients
/// that accept it.
///
/// Responses without a body are left alone. If compression fails the
/// plain body is sent.
pub fn gzip(level: u32) -> impl Fn(&mut Context) + Send + Sync + 'static {
    let level = Compression::new(level.min(9));
    move |ctx: &mut Context| {
        let accepts = ctx
            .header("Accept-Encoding")
            .is_some_and(|v| v.split(',').any(accepts_gzip));
        ctx.next();
        if !accepts || ctx.response().header("Content-Encoding").is_some() {
            return;
        }
        let encoded = ctx.response_mut().encode_body("gzip", |body| {
            let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), level);
            encoder.write_all(body)?;
            encoder.finish()
        });
        if let Err(err) = encoded {
            tracing::warn!(path = %ctx.path(), error = %err, "gzip failed, sending plain body");
        }
    }
}

fn accepts_gzip(coding: &str) -> bool {
    let mut parts = coding.split(';');
    let name = parts.next().unwrap_or_default().trim();
    if !name.eq_ignore_ascii_case("gzip") && name != "*" {
        return false;
    }
    // "gzip;q=0" means never
    !parts.any(|p| {
        p.trim()
            .strip_prefix("q=")
            .and_then(|q| q.trim().parse::<f32>().ok())
            .is_some_and(|q| q <= 0.0)
    })
}

/// Lets the request through when one of `authenticators` accepts it.
///
/// Otherwise aborts with `401 Unauthorized`, or `403 Forbidden` when an
/// authenticator rejected the request outright.
pub fn authenticate(authenticators: Authenticators) -> impl Fn(&mut Context) + Send + Sync + 'static {
    move |ctx: &mut Context| {
        if let Err(err) = authenticators.run(ctx) {
            tracing::debug!(path = %ctx.path(), error = %err, "request not authenticated");
            let status = match err {
                AuthError::Failed => 401,
                AuthError::Rejected(_) => 403,
            };
            ctx.abort_with_status(status);
        }
    }
}

/// Stores `value` under `key` for the rest of the chain.
pub fn with_value<V>(key: impl Into<String>, value: V) -> impl Fn(&mut Context) + Send + Sync + 'static
where
    V: Clone + Send + Sync + 'static,
{
    let key = key.into();
    move |ctx: &mut Context| ctx.set_value(key.clone(), value.clone())
}

/// Replaces the exit action for the rest of the chain.
pub fn with_exit<E>(exit: E) -> impl Fn(&mut Context) + Send + Sync + 'static
where
    E: Exit + Clone + 'static,
{
    move |ctx: &mut Context| ctx.set_exit(exit.clone())
}

/// Aborts the chain, running `exit`.
pub fn exit_with<E>(exit: E) -> impl Fn(&mut Context) + Send + Sync + 'static
where
    E: Exit + Clone + 'static,
{
    move |ctx: &mut Context| ctx.abort_with(exit.clone())
}

/// Serves files under `dir`, using the [`STATIC_PARAM`] wildcard as the
/// relative path.
///
/// Paths leaving `dir` and missing files get the not-found response.
pub fn serve_dir(dir: impl Into<PathBuf>) -> impl Fn(&mut Context) + Send + Sync + 'static {
    let root = dir.into();
    move |ctx: &mut Context| {
        let relative = ctx.param(STATIC_PARAM).unwrap_or_default();
        let Some(file) = resolve(&root, relative) else {
            tracing::debug!(path = %ctx.path(), "rejected static path");
            ctx.not_found();
            ctx.abort_with(Silent);
            return;
        };
        match std::fs::read(&file) {
            Ok(bytes) => {
                ctx.set_header("Content-Type", content_type_for(&file));
                ctx.write(&bytes);
            }
            Err(err) => {
                tracing::debug!(file = %file.display(), error = %err, "static file unavailable");
                ctx.not_found();
                ctx.abort_with(Silent);
            }
        }
    }
}

fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return None;
    }
    let file = root.join(relative);
    file.is_file().then_some(file)
}

fn content_type_for(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("logo.png")), "image/png");
        assert_eq!(content_type_for(Path::new("archive.tar.gz")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn test_accepts_gzip() {
        assert!(accepts_gzip("gzip"));
        assert!(accepts_gzip(" GZIP;q=0.5"));
        assert!(accepts_gzip("*"));
        assert!(!accepts_gzip("gzip;q=0"));
        assert!(!accepts_gzip("deflate"));
        assert!(!accepts_gzip("x-gzip"));
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "1").unwrap();

        assert!(resolve(dir.path(), "app.js").is_some());
        assert!(resolve(dir.path(), "./app.js").is_some());
        assert!(resolve(dir.path(), "../app.js").is_none());
        assert!(resolve(dir.path(), "/etc/passwd").is_none());
        assert!(resolve(dir.path(), "missing.js").is_none());
        assert!(resolve(dir.path(), "").is_none());
    }
}
