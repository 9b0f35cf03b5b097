//! Per-request context threaded through a handler chain.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use cookie::Cookie;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::ContextError;
use crate::exit::{Exit, Silent};
use crate::handler::{handler, FaultHandler, Handler, HandlerChain};
use crate::middleware;
use crate::params::Params;
use crate::request::{Method, Request};
use crate::response::ResponseWriter;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// State shared by every context of one app.
pub(crate) struct Shared {
    pub(crate) config: EngineConfig,
    pub(crate) not_found: Handler,
    pub(crate) on_fault: FaultHandler,
    pub(crate) default_exit: Arc<dyn Exit>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            not_found: handler(middleware::not_found),
            on_fault: Arc::new(middleware::internal_error),
            default_exit: Arc::new(Silent),
        }
    }
}

/// Everything a handler sees about the request being served.
///
/// Contexts are recycled through a pool: all state is cleared between
/// requests, so nothing a handler stores here outlives its request.
pub struct Context {
    pub(crate) request: Request,
    pub(crate) response: ResponseWriter,
    pub(crate) params: Params,
    pub(crate) chain: HandlerChain,
    pub(crate) index: usize,
    pub(crate) current: Option<usize>,
    pub(crate) aborted_at: Option<usize>,
    pub(crate) exit: Arc<dyn Exit>,
    pub(crate) matched: bool,
    pub(crate) detached: bool,
    items: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    form: Option<HashMap<String, String>>,
    shared: Arc<Shared>,
}

impl Context {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            request: Request::new(Method::Get, String::new()),
            response: ResponseWriter::default(),
            params: Params::new(),
            chain: Arc::new([]),
            index: 0,
            current: None,
            aborted_at: None,
            exit: Arc::clone(&shared.default_exit),
            matched: false,
            detached: false,
            items: RwLock::new(HashMap::new()),
            form: None,
            shared,
        }
    }

    /// Clears every per-request field.
    pub(crate) fn reset(&mut self) {
        self.request = Request::new(Method::Get, String::new());
        self.response.clear();
        self.params.clear();
        self.chain = Arc::new([]);
        self.index = 0;
        self.current = None;
        self.aborted_at = None;
        self.exit = Arc::clone(&self.shared.default_exit);
        self.matched = false;
        self.detached = false;
        self.items.get_mut().clear();
        self.form = None;
    }

    // Chain control

    /// Runs the remaining handlers of the chain.
    ///
    /// Middleware calls this to wrap the rest of the chain; handlers that
    /// never call it are followed by their successor anyway. Stops as soon
    /// as the chain is aborted.
    pub fn next(&mut self) {
        self.index += 1;
        while self.index <= self.chain.len() && self.aborted_at.is_none() {
            let handler = Arc::clone(&self.chain[self.index - 1]);
            let caller = self.current.replace(self.index - 1);
            handler(self);
            self.current = caller;
            self.index += 1;
        }
    }

    /// Stops the chain and runs the current exit action.
    ///
    /// Aborting twice has no further effect.
    pub fn abort(&mut self) {
        let exit = Arc::clone(&self.exit);
        self.abort_inner(exit);
    }

    /// Stops the chain and runs `exit` instead of the current exit action.
    pub fn abort_with(&mut self, exit: impl Exit + 'static) {
        self.abort_inner(Arc::new(exit));
    }

    fn abort_inner(&mut self, exit: Arc<dyn Exit>) {
        if self.aborted_at.is_some() {
            return;
        }
        self.aborted_at = Some(
            self.current
                .unwrap_or_else(|| self.index.saturating_sub(1)),
        );
        exit.exit(self);
    }

    /// Stages `status` and aborts.
    pub fn abort_with_status(&mut self, status: u16) {
        self.set_status(status);
        self.abort();
    }

    /// Writes a plain-text body with `status` and aborts.
    pub fn abort_with_string(&mut self, status: u16, body: impl AsRef<str>) {
        self.set_status(status);
        self.string(body);
        self.abort();
    }

    /// Writes a JSON body with `status` and aborts.
    ///
    /// # Errors
    ///
    /// Returns the encoding error; the chain is aborted regardless.
    pub fn abort_with_json<T: Serialize>(&mut self, status: u16, value: &T) -> Result<(), ContextError> {
        self.set_status(status);
        let written = self.json(value);
        self.abort();
        written
    }

    /// Returns true once the chain was aborted.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted_at.is_some()
    }

    /// The handler that aborted the chain.
    #[must_use]
    pub fn abort_handler(&self) -> Option<Handler> {
        self.aborted_at
            .and_then(|index| self.chain.get(index))
            .cloned()
    }

    /// Position of the aborting handler in the chain.
    ///
    /// Middleware that aborts after [`Context::next`] returned is reported
    /// at its own position.
    #[must_use]
    pub const fn aborted_at(&self) -> Option<usize> {
        self.aborted_at
    }

    /// Replaces the exit action used by [`Context::abort`].
    pub fn set_exit(&mut self, exit: impl Exit + 'static) {
        self.exit = Arc::new(exit);
    }

    /// Runs the app's not-found handler on this context.
    pub fn not_found(&mut self) {
        let not_found = Arc::clone(&self.shared.not_found);
        not_found(self);
    }

    /// Keeps this context out of the pool once the request is done.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// Returns true when the context will not be recycled.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detached
    }

    /// Returns true when a route matched the request.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.matched
    }

    /// App configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    // Request

    /// The request being served.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.request.method
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Captured path parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// A path parameter by name.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// A query string value by name.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.request.get_query(key)
    }

    /// A request header, ignoring case.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.request.get_header(key)
    }

    /// The request's content type without parameters.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
            .map(|value| value.split(';').next().unwrap_or(value).trim())
    }

    /// A form field from a urlencoded body. The body is parsed once.
    pub fn form_value(&mut self, key: &str) -> Option<&str> {
        if self.form.is_none() {
            let form = if self
                .content_type()
                .is_some_and(|ct| ct.eq_ignore_ascii_case(FORM_CONTENT_TYPE))
            {
                Request::parse_query_string(&String::from_utf8_lossy(&self.request.body))
            } else {
                HashMap::new()
            };
            self.form = Some(form);
        }
        self.form.as_ref()?.get(key).map(String::as_str)
    }

    /// A request cookie by name.
    ///
    /// Malformed pairs in the `Cookie` header are skipped.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        Cookie::split_parse(self.header("Cookie")?)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(Cookie::into_owned)
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Json`] when the body does not decode into `T`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        Ok(self.request.json()?)
    }

    /// Returns true for a websocket upgrade request.
    #[must_use]
    pub fn is_websocket(&self) -> bool {
        self.header("Connection")
            .is_some_and(|v| v.to_ascii_lowercase().contains("upgrade"))
            && self
                .header("Upgrade")
                .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
    }

    /// Returns true for an `XMLHttpRequest`.
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.header("X-Requested-With") == Some("XMLHttpRequest")
    }

    // Values

    /// Stores a value for later handlers of the same request.
    pub fn set_value<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) {
        self.items.write().insert(key.into(), Arc::new(value));
    }

    /// A stored value, if present with type `V`.
    #[must_use]
    pub fn value<V: Any + Clone>(&self, key: &str) -> Option<V> {
        self.items
            .read()
            .get(key)
            .and_then(|value| value.downcast_ref::<V>())
            .cloned()
    }

    /// Removes a stored value, returning true if it existed.
    pub fn remove_value(&self, key: &str) -> bool {
        self.items.write().remove(key).is_some()
    }

    // Response

    /// The response under construction.
    #[must_use]
    pub const fn response(&self) -> &ResponseWriter {
        &self.response
    }

    /// Mutable access to the response under construction.
    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    /// Stages the response status.
    pub fn set_status(&mut self, status: u16) {
        self.response.set_status(status);
    }

    /// Stages a response header.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.response.set_header(key, value);
    }

    /// Stages another value for a response header.
    pub fn append_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.response.append_header(key, value);
    }

    /// Adds a `Set-Cookie` header, keeping cookies set earlier.
    pub fn set_cookie(&mut self, cookie: Cookie<'_>) {
        self.response.append_header("Set-Cookie", cookie.to_string());
    }

    /// Appends raw bytes to the body.
    pub fn write(&mut self, data: &[u8]) -> bool {
        self.response.write(data)
    }

    /// Writes a plain-text body.
    pub fn string(&mut self, body: impl AsRef<str>) {
        self.write_typed("text/plain; charset=utf-8", body.as_ref().as_bytes());
    }

    /// Writes an HTML body.
    pub fn html(&mut self, body: impl AsRef<str>) {
        self.write_typed("text/html; charset=utf-8", body.as_ref().as_bytes());
    }

    /// Writes `value` as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Json`] if `value` cannot be encoded; nothing is
    /// written in that case.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<(), ContextError> {
        let body = serde_json::to_vec(value)?;
        self.write_typed("application/json", &body);
        Ok(())
    }

    /// Redirects to `location` with a 3xx `status`.
    pub fn redirect(&mut self, status: u16, location: impl Into<String>) {
        self.set_header("Location", location);
        self.set_status(status);
        self.response.commit();
    }

    fn write_typed(&mut self, content_type: &str, body: &[u8]) {
        if self.response.header("Content-Type").is_none() {
            self.response.set_header("Content-Type", content_type);
        }
        self.response.write(body);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("params", &self.params)
            .field("index", &self.index)
            .field("current", &self.current)
            .field("aborted_at", &self.aborted_at)
            .field("matched", &self.matched)
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn context_with(chain: Vec<Handler>) -> Context {
        let mut ctx = Context::new(Arc::new(Shared::default()));
        ctx.chain = chain.into();
        ctx
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> Handler {
        let log = Arc::clone(log);
        handler(move |_ctx: &mut Context| log.lock().unwrap().push(label.to_string()))
    }

    #[test]
    fn test_next_runs_chain_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context_with(vec![
            recorder(&log, "a"),
            recorder(&log, "b"),
            recorder(&log, "c"),
        ]);
        ctx.next();
        assert_eq!(*log.lock().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_middleware_wraps_rest_of_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outer = {
            let log = Arc::clone(&log);
            handler(move |ctx: &mut Context| {
                log.lock().unwrap().push("before".to_string());
                ctx.next();
                log.lock().unwrap().push("after".to_string());
            })
        };
        let mut ctx = context_with(vec![outer, recorder(&log, "inner")]);
        ctx.next();
        assert_eq!(*log.lock().unwrap(), ["before", "inner", "after"]);
    }

    #[test]
    fn test_abort_stops_chain_and_records_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context_with(vec![
            recorder(&log, "a"),
            handler(|ctx: &mut Context| ctx.abort_with_status(403)),
            recorder(&log, "c"),
        ]);
        ctx.next();

        assert_eq!(*log.lock().unwrap(), ["a"]);
        assert!(ctx.is_aborted());
        assert_eq!(ctx.aborted_at(), Some(1));
        assert!(ctx.abort_handler().is_some());
        assert_eq!(ctx.response().status(), Some(403));
    }

    #[test]
    fn test_abort_after_next_records_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let guard = handler(|ctx: &mut Context| {
            ctx.next();
            ctx.abort();
        });
        let mut ctx = context_with(vec![guard, recorder(&log, "a"), recorder(&log, "b")]);
        ctx.next();

        assert_eq!(*log.lock().unwrap(), ["a", "b"]);
        assert_eq!(ctx.aborted_at(), Some(0));
        assert!(ctx.abort_handler().is_some());
    }

    #[test]
    fn test_nested_abort_records_inner_handler() {
        let outer = handler(|ctx: &mut Context| {
            ctx.next();
            ctx.set_header("X-After", "1");
        });
        let mut ctx = context_with(vec![
            outer,
            handler(|_ctx: &mut Context| {}),
            handler(|ctx: &mut Context| ctx.abort_with_status(401)),
        ]);
        ctx.next();

        assert_eq!(ctx.aborted_at(), Some(2));
        assert_eq!(ctx.response().header("x-after"), Some("1"));
        assert_eq!(ctx.current, None);
    }

    #[test]
    fn test_abort_runs_exit_once() {
        let runs = Arc::new(Mutex::new(0));
        let exit = {
            let runs = Arc::clone(&runs);
            move |_ctx: &mut Context| *runs.lock().unwrap() += 1
        };
        let mut ctx = context_with(Vec::new());
        ctx.set_exit(exit);
        ctx.abort();
        ctx.abort();
        assert_eq!(*runs.lock().unwrap(), 1);
    }

    #[test]
    fn test_abort_with_overrides_exit() {
        let mut ctx = context_with(Vec::new());
        ctx.set_exit(crate::exit::Status(401));
        ctx.abort_with(crate::exit::Status(429));
        assert_eq!(ctx.response().status(), Some(429));
    }

    #[test]
    fn test_values_are_typed() {
        let ctx = context_with(Vec::new());
        ctx.set_value("user", "ada".to_string());
        ctx.set_value("id", 7_u32);

        assert_eq!(ctx.value::<String>("user"), Some("ada".to_string()));
        assert_eq!(ctx.value::<u32>("id"), Some(7));
        assert_eq!(ctx.value::<u64>("id"), None);
        assert!(ctx.remove_value("id"));
        assert!(!ctx.remove_value("id"));
    }

    #[test]
    fn test_form_value_requires_form_content_type() {
        let mut ctx = context_with(Vec::new());
        ctx.request = Request::post("/login")
            .header("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")
            .body("user=ada&pass=a%26b");
        assert_eq!(ctx.content_type(), Some("application/x-www-form-urlencoded"));
        assert_eq!(ctx.form_value("pass"), Some("a&b"));

        let mut ctx = context_with(Vec::new());
        ctx.request = Request::post("/login").body("user=ada");
        assert_eq!(ctx.form_value("user"), None);
    }

    #[test]
    fn test_request_kind_helpers() {
        let mut ctx = context_with(Vec::new());
        ctx.request = Request::get("/ws")
            .header("Connection", "keep-alive, Upgrade")
            .header("Upgrade", "websocket")
            .header("X-Requested-With", "XMLHttpRequest");
        assert!(ctx.is_websocket());
        assert!(ctx.is_ajax());
    }

    #[test]
    fn test_json_and_bind_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Login {
            user: String,
        }

        let mut ctx = context_with(Vec::new());
        ctx.request = Request::post("/").body(r#"{"user":"ada"}"#);
        assert_eq!(
            ctx.bind_json::<Login>().unwrap(),
            Login {
                user: "ada".to_string()
            }
        );

        ctx.json(&serde_json::json!({"ok": true})).unwrap();
        let res = ctx.response.take();
        assert_eq!(res.get_header("content-type"), Some("application/json"));
        assert_eq!(res.body, br#"{"ok":true}"#);
    }

    #[test]
    fn test_cookies() {
        let mut ctx = context_with(Vec::new());
        ctx.request = Request::get("/").header("Cookie", "theme=dark; session=abc123; broken");
        assert_eq!(ctx.cookie("session").map(|c| c.value().to_string()), Some("abc123".to_string()));
        assert!(ctx.cookie("missing").is_none());

        ctx.set_cookie(Cookie::build(("session", "xyz")).path("/").http_only(true).build());
        ctx.set_cookie(Cookie::new("theme", "light"));
        let res = ctx.response.take();
        assert_eq!(
            res.get_headers("set-cookie"),
            vec!["session=xyz; HttpOnly; Path=/", "theme=light"]
        );
    }

    #[test]
    fn test_redirect_commits_without_body() {
        let mut ctx = context_with(Vec::new());
        ctx.redirect(302, "/login");
        ctx.set_status(200);
        let res = ctx.response.take();
        assert_eq!(res.status, 302);
        assert_eq!(res.get_header("location"), Some("/login"));
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_reset_clears_request_state() {
        let mut ctx = context_with(vec![handler(|ctx: &mut Context| ctx.abort())]);
        ctx.request = Request::post("/login")
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body("user=ada");
        assert_eq!(ctx.form_value("user"), Some("ada"));
        ctx.params.push("id", "1");
        ctx.matched = true;
        ctx.detach();
        ctx.set_value("k", 1_i32);
        ctx.set_header("X-Leak", "1");
        ctx.set_status(418);
        ctx.set_exit(crate::exit::Status(500));
        ctx.next();
        ctx.string("body");

        ctx.reset();

        ctx.request = Request::post("/login");
        assert_eq!(ctx.form_value("user"), None);
        assert_eq!(ctx.response().header("x-leak"), None);
        assert_eq!(ctx.response().status(), None);
        assert_eq!(ctx.current, None);
        ctx.request = Request::new(Method::Get, String::new());

        assert!(ctx.request.path.is_empty());
        assert!(ctx.request.body.is_empty());
        assert!(ctx.params.is_empty());
        assert!(ctx.chain.is_empty());
        assert_eq!(ctx.index, 0);
        assert!(!ctx.is_aborted());
        assert!(!ctx.is_matched());
        assert!(!ctx.is_detached());
        assert_eq!(ctx.value::<i32>("k"), None);
        assert!(!ctx.response.is_committed());
        assert!(!ctx.response.has_body());

        ctx.abort();
        assert_eq!(ctx.response().status(), None);
    }
}
