//! Request authentication.

use std::sync::Arc;

use crate::context::Context;
use crate::error::AuthError;

/// Decides whether a request is authenticated.
///
/// `Ok(false)` lets the next authenticator try; an error ends the check.
/// Any `Fn(&mut Context) -> Result<bool, AuthError>` closure is an
/// authenticator.
pub trait Authenticator: Send + Sync {
    /// Checks the request held by `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] to refuse the request without asking
    /// the remaining authenticators.
    fn authenticate(&self, ctx: &mut Context) -> Result<bool, AuthError>;
}

impl<F> Authenticator for F
where
    F: Fn(&mut Context) -> Result<bool, AuthError> + Send + Sync,
{
    fn authenticate(&self, ctx: &mut Context) -> Result<bool, AuthError> {
        self(ctx)
    }
}

/// Authenticators tried in order until one accepts.
#[derive(Clone, Default)]
pub struct Authenticators {
    list: Vec<Arc<dyn Authenticator>>,
}

impl Authenticators {
    /// Creates an empty list, which accepts nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an authenticator.
    #[must_use]
    pub fn with(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.list.push(Arc::new(authenticator));
        self
    }

    /// Number of authenticators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true when no authenticator was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Runs the authenticators in order.
    ///
    /// # Errors
    ///
    /// Returns the first authenticator error, or [`AuthError::Failed`] when
    /// none accepted the request.
    pub fn run(&self, ctx: &mut Context) -> Result<(), AuthError> {
        for authenticator in &self.list {
            if authenticator.authenticate(ctx)? {
                return Ok(());
            }
        }
        Err(AuthError::Failed)
    }
}

impl std::fmt::Debug for Authenticators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticators")
            .field("len", &self.list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Shared;
    use crate::request::Request;

    fn context(request: Request) -> Context {
        let mut ctx = Context::new(Arc::new(Shared::default()));
        ctx.request = request;
        ctx
    }

    fn token(ctx: &mut Context) -> Result<bool, AuthError> {
        Ok(ctx.header("Authorization") == Some("Bearer secret"))
    }

    fn banned(ctx: &mut Context) -> Result<bool, AuthError> {
        match ctx.header("X-Client") {
            Some("banned") => Err(AuthError::Rejected("client is banned".to_string())),
            _ => Ok(false),
        }
    }

    #[test]
    fn test_first_accepting_authenticator_wins() {
        let auth = Authenticators::new().with(banned).with(token);
        assert_eq!(auth.len(), 2);

        let mut ctx = context(Request::get("/").header("Authorization", "Bearer secret"));
        assert_eq!(auth.run(&mut ctx), Ok(()));

        let mut ctx = context(Request::get("/"));
        assert_eq!(auth.run(&mut ctx), Err(AuthError::Failed));
    }

    #[test]
    fn test_error_stops_later_authenticators() {
        let auth = Authenticators::new().with(banned).with(token);
        let mut ctx = context(
            Request::get("/")
                .header("X-Client", "banned")
                .header("Authorization", "Bearer secret"),
        );
        assert_eq!(
            auth.run(&mut ctx),
            Err(AuthError::Rejected("client is banned".to_string()))
        );
    }

    #[test]
    fn test_empty_list_fails() {
        let auth = Authenticators::new();
        assert!(auth.is_empty());
        let mut ctx = context(Request::get("/"));
        assert_eq!(auth.run(&mut ctx), Err(AuthError::Failed));
    }
}
