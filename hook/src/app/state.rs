//! Application state management

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::monitor::DeployMonitor;
use crate::errors::HookError;
use crate::gate::DeployGate;
use crate::http::client::RenderClient;
use crate::notify::sinks::{LogNotifier, WebhookNotifier};
use crate::notify::Notifier;
use crate::server::state::ServerState;
use crate::storage::settings::Settings;
use crate::workers::monitor::{MonitorJob, MonitorQueue};

/// Main application state
pub struct AppState {
    pub settings: Arc<Settings>,
    pub gate: DeployGate,
    pub client: RenderClient,
    pub monitor: Arc<DeployMonitor>,
    pub monitor_queue: MonitorQueue,
}

impl AppState {
    /// Initialize application state.
    ///
    /// Also returns the receiving end of the monitor queue, to be handed to
    /// the monitor worker.
    pub async fn init(
        settings: Settings,
        options: &AppOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MonitorJob>), HookError> {
        info!("Initializing application state...");

        let gate = DeployGate::open(options.storage.clone()).await?;
        let client = RenderClient::new(&settings.base_url)?;
        let notifier = build_notifier(&settings)?;
        let monitor = Arc::new(DeployMonitor::new(
            client.clone(),
            notifier,
            options.poll,
        ));
        let (monitor_queue, jobs) = MonitorQueue::channel();

        info!(
            projects = settings.projects.len(),
            configured = settings.projects.configured_ids().len(),
            base_url = %settings.base_url,
            "Application state ready"
        );

        let state = Self {
            settings: Arc::new(settings),
            gate,
            client,
            monitor,
            monitor_queue,
        };
        Ok((state, jobs))
    }

    /// State handed to the HTTP handlers
    pub fn server_state(&self) -> ServerState {
        ServerState::new(
            self.settings.clone(),
            self.gate.clone(),
            self.client.clone(),
            self.monitor_queue.clone(),
        )
    }
}

fn build_notifier(settings: &Settings) -> Result<Arc<dyn Notifier>, HookError> {
    match &settings.notify_webhook_url {
        Some(url) => {
            info!(host = url.host_str().unwrap_or("-"), "Sending notifications to webhook");
            Ok(Arc::new(WebhookNotifier::new(
                url.clone(),
                settings.prefer_custom_domain,
            )?))
        }
        None => {
            info!("No notification webhook configured, notifications are only logged");
            Ok(Arc::new(LogNotifier::new(settings.prefer_custom_domain)))
        }
    }
}
