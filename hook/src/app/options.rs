//! Application configuration options

use std::time::Duration;

use crate::http::deploys::PollOptions;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{Settings, DEFAULT_PORT};
use crate::workers::monitor;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Lock and timestamp storage
    pub storage: StorageLayout,

    /// Server configuration
    pub server: ServerOptions,

    /// Deploy status polling
    pub poll: PollOptions,

    /// Monitor worker options
    pub monitor_worker: monitor::Options,
}

impl AppOptions {
    /// Options derived from loaded settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            storage: StorageLayout::new(settings.locks_dir.clone()),
            server: ServerOptions {
                host: settings.host.clone(),
                port: settings.port,
            },
            poll: PollOptions {
                max_attempts: settings.max_poll_attempts,
                interval: settings.poll_interval,
            },
            ..Default::default()
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Upper bound for a graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}
