//! Server state

use std::sync::Arc;

use crate::gate::DeployGate;
use crate::http::client::RenderClient;
use crate::storage::settings::Settings;
use crate::workers::monitor::MonitorQueue;

/// Server state shared across handlers
pub struct ServerState {
    pub settings: Arc<Settings>,
    pub gate: DeployGate,
    pub client: RenderClient,
    pub monitor_queue: MonitorQueue,
}

impl ServerState {
    pub fn new(
        settings: Arc<Settings>,
        gate: DeployGate,
        client: RenderClient,
        monitor_queue: MonitorQueue,
    ) -> Self {
        Self {
            settings,
            gate,
            client,
            monitor_queue,
        }
    }
}
