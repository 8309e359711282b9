//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::deploy::monitor::DeployMonitor;
use crate::errors::HookError;
use crate::server::serve::serve;
use crate::storage::settings::Settings;
use crate::workers::monitor::{self, MonitorJob};

/// Run the webhook service until `shutdown_signal` resolves
pub async fn run(
    settings: Settings,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HookError> {
    info!("Initializing renderhook...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(settings, &options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start renderhook: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    settings: Settings,
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), HookError> {
    let (app_state, jobs) = AppState::init(settings, options).await?;

    init_monitor_worker(
        options.monitor_worker.clone(),
        app_state.monitor.clone(),
        jobs,
        shutdown_manager,
    )?;

    init_server(options, &app_state, shutdown_manager, shutdown_tx.subscribe()).await?;

    Ok(())
}

fn init_monitor_worker(
    options: monitor::Options,
    deploy_monitor: Arc<DeployMonitor>,
    jobs: mpsc::UnboundedReceiver<MonitorJob>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), HookError> {
    info!("Initializing monitor worker...");

    // Stopped by the shutdown manager once the server has finished, not by
    // the broadcast: in-flight requests may still enqueue until then.
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let monitor_handle = tokio::spawn(async move {
        monitor::run(
            &options,
            deploy_monitor,
            jobs,
            Box::pin(async move {
                let _ = stop_rx.await;
            }),
        )
        .await;
    });

    shutdown_manager.with_monitor_worker(monitor_handle, stop_tx)
}

async fn init_server(
    options: &AppOptions,
    app_state: &AppState,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), HookError> {
    info!("Initializing HTTP server...");

    let server_state = Arc::new(app_state.server_state());
    let server_handle = serve(&options.server, server_state, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    server_handle: Option<JoinHandle<Result<(), HookError>>>,
    monitor_worker_handle: Option<JoinHandle<()>>,
    monitor_worker_stop: Option<oneshot::Sender<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            server_handle: None,
            monitor_worker_handle: None,
            monitor_worker_stop: None,
        }
    }

    pub fn with_monitor_worker(
        &mut self,
        handle: JoinHandle<()>,
        stop: oneshot::Sender<()>,
    ) -> Result<(), HookError> {
        if self.monitor_worker_handle.is_some() {
            return Err(HookError::Internal("monitor_worker_handle already set".to_string()));
        }
        self.monitor_worker_handle = Some(handle);
        self.monitor_worker_stop = Some(stop);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), HookError>>,
    ) -> Result<(), HookError> {
        if self.server_handle.is_some() {
            return Err(HookError::Internal("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), HookError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                );
                Err(HookError::Internal("shutdown timed out".to_string()))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), HookError> {
        info!("Shutting down renderhook...");

        // 1. HTTP server; requests still in flight may enqueue until it returns
        let server_result = match self.server_handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| HookError::Internal(e.to_string()))
                .and_then(|result| result),
            None => Ok(()),
        };

        // 2. Monitor worker, runs what is queued and drains in-flight tasks
        if let Some(stop) = self.monitor_worker_stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.monitor_worker_handle.take() {
            handle
                .await
                .map_err(|e| HookError::Internal(e.to_string()))?;
        }

        info!("Shutdown complete");
        server_result
    }
}
