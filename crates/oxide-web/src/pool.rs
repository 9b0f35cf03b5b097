//! Recycling of request contexts.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::{Context, Shared};

/// Pool of idle contexts.
///
/// Every released context is reset before it becomes available again, so a
/// context never carries state from one request into the next.
pub struct ContextPool {
    shared: Arc<Shared>,
    idle: Mutex<Vec<Box<Context>>>,
    capacity: usize,
}

impl ContextPool {
    pub(crate) fn new(shared: Arc<Shared>, capacity: usize) -> Self {
        Self {
            shared,
            idle: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Takes an idle context or creates a fresh one.
    pub fn acquire(&self) -> Box<Context> {
        let reused = self.idle.lock().pop();
        reused.unwrap_or_else(|| Box::new(Context::new(Arc::clone(&self.shared))))
    }

    /// Returns a context to the pool.
    ///
    /// Detached contexts are dropped, as are contexts beyond capacity.
    pub fn release(&self, mut ctx: Box<Context>) {
        if ctx.is_detached() {
            tracing::trace!("dropping detached context");
            return;
        }
        ctx.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(ctx);
        }
    }

    /// Number of idle contexts.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.idle())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use crate::request::Request;

    fn pool(capacity: usize) -> ContextPool {
        ContextPool::new(Arc::new(Shared::default()), capacity)
    }

    #[test]
    fn test_released_context_is_reused_clean() {
        let pool = pool(4);
        let mut ctx = pool.acquire();
        ctx.request = Request::post("/users/1")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("user=ada");
        assert_eq!(ctx.form_value("user"), Some("ada"));
        ctx.params.push("id", "1");
        ctx.chain = vec![handler(|ctx: &mut Context| ctx.abort_with_status(401))].into();
        ctx.matched = true;
        ctx.set_value("user", "ada".to_string());
        ctx.set_exit(crate::exit::Status(503));
        ctx.set_header("X-Leak", "1");
        ctx.set_cookie(cookie::Cookie::new("session", "abc"));
        ctx.next();
        let before: *const Context = &*ctx;
        pool.release(ctx);
        assert_eq!(pool.idle(), 1);

        let mut ctx = pool.acquire();
        assert_eq!(&*ctx as *const Context, before);
        assert!(ctx.path().is_empty());
        assert!(ctx.request().body.is_empty());
        assert!(ctx.params().is_empty());
        assert!(!ctx.is_aborted());
        assert!(!ctx.is_matched());
        assert_eq!(ctx.value::<String>("user"), None);
        assert_eq!(ctx.response().status(), None);
        assert_eq!(ctx.response().header("x-leak"), None);
        assert_eq!(ctx.response().header("set-cookie"), None);

        ctx.request = Request::post("/users/1");
        assert_eq!(ctx.form_value("user"), None);
        ctx.abort();
        assert_eq!(ctx.response().status(), None);
    }

    #[test]
    fn test_detached_context_is_not_returned() {
        let pool = pool(4);
        let mut ctx = pool.acquire();
        ctx.detach();
        pool.release(ctx);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_capacity_bounds_idle_contexts() {
        let pool = pool(1);
        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle(), 1);
    }
}
