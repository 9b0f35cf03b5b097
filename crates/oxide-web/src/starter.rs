//! Hooks run once after an app is built.

use std::error::Error;

use crate::app::App;

/// Error type returned by starters.
pub type StartError = Box<dyn Error + Send + Sync>;

/// Runs once when [`Engine::build`](crate::Engine::build) completes.
///
/// A failing starter fails the build.
pub trait Starter: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Inspects the freshly built app.
    ///
    /// # Errors
    ///
    /// Any error aborts the build.
    fn start(&self, app: &App) -> Result<(), StartError>;
}

/// Logs a banner.
#[derive(Debug, Clone)]
pub struct BannerStarter {
    banner: String,
}

impl BannerStarter {
    /// Creates a starter that logs `banner`.
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
        }
    }
}

impl Default for BannerStarter {
    fn default() -> Self {
        Self::new(concat!("oxide-web ", env!("CARGO_PKG_VERSION")))
    }
}

impl Starter for BannerStarter {
    fn name(&self) -> &str {
        "banner"
    }

    fn start(&self, app: &App) -> Result<(), StartError> {
        tracing::info!(routes = app.router().len(), debug = app.config().debug, "{}", self.banner);
        Ok(())
    }
}

/// Logs every registered route.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteInfoStarter;

impl Starter for RouteInfoStarter {
    fn name(&self) -> &str {
        "route-info"
    }

    fn start(&self, app: &App) -> Result<(), StartError> {
        for route in app.routes() {
            tracing::info!(method = %route.method, path = %route.path, handlers = route.handlers, "route");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuildError, Engine};

    struct Failing;

    impl Starter for Failing {
        fn start(&self, app: &App) -> Result<(), StartError> {
            if app.routes().is_empty() {
                return Err("no routes registered".into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_builtin_starters_succeed() {
        let app = Engine::new()
            .get("/", |_| {})
            .starter(BannerStarter::default())
            .starter(RouteInfoStarter)
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn test_failing_starter_fails_build() {
        let err = Engine::new().starter(Failing).build().unwrap_err();
        match err {
            BuildError::Starter { name, message } => {
                assert!(name.ends_with("Failing"));
                assert_eq!(message, "no routes registered");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
