//! Server configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use oxide_web::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServeError};

/// Default cap on request bodies: 2 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Server settings, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Address to bind.
    pub addr: SocketAddr,
    /// Requests with larger bodies are answered with 413.
    pub max_body_bytes: usize,
    /// Directory served under `/static`.
    pub static_dir: Option<PathBuf>,
    /// Log a banner once the app is built.
    pub banner: bool,
    /// Settings for the application itself.
    pub engine: EngineConfig,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            static_dir: None,
            banner: true,
            engine: EngineConfig::default(),
        }
    }
}

impl ServeConfig {
    /// Loads a configuration file. Missing fields take their default.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Io`] if the file cannot be read and
    /// [`ServeError::Config`] if it is not valid JSON for this type.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| ServeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
