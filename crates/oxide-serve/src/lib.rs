//! # oxide-serve
//!
//! HTTP/1 transport for [`oxide_web`] applications.
//!
//! Each connection is served by hyper on a tokio task. Handlers are
//! synchronous, so every [`App::dispatch`] call runs on tokio's blocking pool.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use oxide_serve::{serve, ServeConfig};
//! use oxide_web::Engine;
//!
//! # async fn run() -> oxide_serve::Result<()> {
//! let app = Engine::new().get("/ping", |ctx| ctx.string("pong")).build()?;
//! serve(Arc::new(app), &ServeConfig::default()).await
//! # }
//! ```

mod config;
mod error;

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use oxide_web::{App, Fault, Method, Request, Response};

pub use config::{ServeConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::{Result, ServeError};

/// Binds `config.addr` and serves `app` until ctrl-c.
///
/// # Errors
///
/// Returns [`ServeError::Io`] if the address cannot be bound.
pub async fn serve(app: Arc<App>, config: &ServeConfig) -> Result<()> {
    let listener = TcpListener::bind(config.addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "listening");
    serve_listener(app, listener, config.max_body_bytes, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Serves `app` on an already bound listener until `shutdown` completes.
///
/// Connections still open at shutdown are left to finish on their own
/// tasks.
///
/// # Errors
///
/// Currently always returns `Ok`; accept failures are logged and skipped.
pub async fn serve_listener<S>(
    app: Arc<App>,
    listener: TcpListener,
    max_body_bytes: usize,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    continue;
                }
            },
            () = &mut shutdown => {
                tracing::info!("shutting down");
                return Ok(());
            }
        };

        let io = TokioIo::new(stream);
        let app = Arc::clone(&app);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&app), remote, max_body_bytes));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!(%remote, error = %err, "error serving connection");
            }
        });
    }
}

/// Serves one hyper request through `app`.
///
/// Never fails: bodies over `max_body_bytes` get 413, unreadable bodies 400,
/// methods the router does not know 501.
///
/// # Errors
///
/// The error type is [`Infallible`], as hyper's `service_fn` expects.
pub async fn handle<B>(
    req: HyperRequest<B>,
    app: Arc<App>,
    remote: SocketAddr,
    max_body_bytes: usize,
) -> std::result::Result<HyperResponse<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(err) if err.is::<LengthLimitError>() => {
            tracing::warn!(%remote, path = %parts.uri.path(), limit = max_body_bytes, "request body too large");
            return Ok(plain(StatusCode::PAYLOAD_TOO_LARGE));
        }
        Err(err) => {
            tracing::debug!(%remote, error = %err, "failed to read request body");
            return Ok(plain(StatusCode::BAD_REQUEST));
        }
    };

    let Some(request) = into_request(&parts, body, Some(remote)) else {
        tracing::warn!(%remote, method = %parts.method, path = %parts.uri.path(), "unsupported method");
        return Ok(plain(StatusCode::NOT_IMPLEMENTED));
    };

    match tokio::task::spawn_blocking(move || app.dispatch(request)).await {
        Ok(response) => Ok(into_hyper(response)),
        Err(err) => {
            tracing::error!(%remote, error = %err, "dispatch task failed");
            Ok(plain(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

/// Converts hyper request parts and a collected body into a [`Request`].
///
/// Returns `None` for methods outside [`Method::ALL`]. Repeated headers are
/// joined with `", "`, repeated `Cookie` headers with `"; "`.
#[must_use]
pub fn into_request(parts: &Parts, body: Vec<u8>, remote: Option<SocketAddr>) -> Option<Request> {
    let method = Method::parse(parts.method.as_str())?;
    let mut request = Request::new(method, parts.uri.path());

    if let Some(query) = parts.uri.query() {
        request.query = Request::parse_query_string(query);
    }

    for (key, value) in &parts.headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let separator = if *key == hyper::header::COOKIE { "; " } else { ", " };
        request
            .headers
            .entry(key.to_string())
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    request.body = body;
    request.remote_addr = remote;
    Some(request)
}

/// Converts a [`Response`] into a hyper response.
///
/// Repeated headers such as `Set-Cookie` are kept as separate fields.
/// Headers that are not valid HTTP are dropped with a warning.
#[must_use]
pub fn into_hyper(res: Response) -> HyperResponse<Full<Bytes>> {
    let status = StatusCode::from_u16(res.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = HyperResponse::new(Full::new(Bytes::from(res.body)));
    *response.status_mut() = status;

    for (key, value) in &res.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %key, "dropping invalid response header"),
        }
    }

    response
}

/// Routes panic reports through `tracing` instead of stderr.
///
/// Handler panics are still caught and answered by the app's fault handler;
/// this only replaces how the panic itself is reported.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let fault = Fault::from_panic(info.payload());
        match info.location() {
            Some(location) => tracing::error!(
                file = location.file(),
                line = location.line(),
                message = %fault,
                "panic"
            ),
            None => tracing::error!(message = %fault, "panic"),
        }
    }));
}

fn plain(status: StatusCode) -> HyperResponse<Full<Bytes>> {
    let text = status.canonical_reason().unwrap_or("Error");
    let mut response = HyperResponse::new(Full::new(Bytes::from(text)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
