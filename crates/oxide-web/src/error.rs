//! Error types for route registration and request handling.

use thiserror::Error;

use crate::request::Method;

/// Errors raised while registering routes.
///
/// These are configuration mistakes: they surface from [`Engine::build`]
/// before any request is served.
///
/// [`Engine::build`]: crate::Engine::build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path is empty or does not start with `/`.
    #[error("path must begin with '/' in path '{0}'")]
    InvalidPath(String),

    /// The path pattern is malformed.
    #[error("invalid path pattern '{path}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The exact path is already registered.
    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    /// A parameter with a different name already occupies this position.
    #[error("parameter ':{new}' in '{path}' conflicts with existing parameter ':{existing}'")]
    ConflictingParam {
        /// The pattern being inserted.
        path: String,
        /// Name of the parameter already in the tree.
        existing: String,
        /// Name of the rejected parameter.
        new: String,
    },

    /// A wildcard with a different name already occupies this position.
    #[error("wildcard '*{new}' in '{path}' conflicts with existing wildcard '*{existing}'")]
    ConflictingWildcard {
        /// The pattern being inserted.
        path: String,
        /// Name of the wildcard already in the tree.
        existing: String,
        /// Name of the rejected wildcard.
        new: String,
    },
}

/// Errors returned by [`Engine::build`](crate::Engine::build).
#[derive(Debug, Error)]
pub enum BuildError {
    /// A route could not be inserted into the router.
    #[error("cannot register {method} {path}: {source}")]
    Route {
        /// Method of the rejected route.
        method: Method,
        /// Full path of the rejected route.
        path: String,
        /// Underlying registration error.
        #[source]
        source: RouteError,
    },

    /// A starter failed.
    #[error("starter '{name}' failed: {message}")]
    Starter {
        /// Name of the starter.
        name: String,
        /// Failure description.
        message: String,
    },
}

/// Errors a handler can hit while reading the request.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A required path parameter is missing.
    #[error("missing path parameter: {0}")]
    MissingParam(String),

    /// A path parameter could not be parsed into the requested type.
    #[error("invalid value '{value}' for path parameter '{key}'")]
    InvalidParam {
        /// Parameter name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from [`Authenticator`](crate::Authenticator)s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No authenticator accepted the request.
    #[error("authentication failed")]
    Failed,

    /// An authenticator refused the request outright.
    #[error("authentication rejected: {0}")]
    Rejected(String),
}

/// Result type alias for route registration.
pub type Result<T> = std::result::Result<T, RouteError>;
