//! Handler types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;

/// A request handler or middleware.
///
/// Middleware is an ordinary handler that calls [`Context::next`] to run the
/// rest of the chain and does its own work around that call.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Handlers run for one matched route, in order.
pub type HandlerChain = Arc<[Handler]>;

/// Handler invoked with the fault after a handler panicked.
pub type FaultHandler = Arc<dyn Fn(&mut Context, &Fault) + Send + Sync>;

/// Wraps a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A panic caught while running a handler chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    message: String,
}

impl Fault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a fault from a panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(s) = payload.downcast_ref::<&str>() {
            Self::new(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::new(s.clone())
        } else {
            Self::new("unknown panic payload")
        }
    }

    /// Panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_from_panic_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(Fault::from_panic(payload.as_ref()).message(), "static message");

        let id = 7;
        let payload = std::panic::catch_unwind(|| panic!("formatted {id}")).unwrap_err();
        assert_eq!(Fault::from_panic(payload.as_ref()).message(), "formatted 7");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(
            Fault::from_panic(payload.as_ref()).to_string(),
            "unknown panic payload"
        );
    }
}
