//! Monitor worker
//!
//! Receives jobs from the webhook handler and runs each one as a task: a
//! [`DeployMonitor::watch`] per accepted deploy, or a single notification
//! delivery when the deploy never started. Panics of a task stop at this
//! boundary and are only logged.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::deploy::monitor::DeployMonitor;
use crate::errors::HookError;
use crate::models::attempt::DeployAttempt;
use crate::notify::message::DeployNotification;

/// Monitor worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// How long shutdown waits for in-flight tasks
    pub drain_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(10),
        }
    }
}

/// Work handed to the monitor worker
#[derive(Debug)]
pub enum MonitorJob {
    /// Follow a triggered deploy until it ends
    Watch(DeployAttempt),

    /// Deliver a notification for a deploy that was never created
    Notify(DeployNotification),
}

/// Sending half of the monitor queue
#[derive(Debug, Clone)]
pub struct MonitorQueue {
    tx: mpsc::UnboundedSender<MonitorJob>,
}

impl MonitorQueue {
    /// Create the queue and the receiver the worker consumes
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MonitorJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Hand an attempt over to the worker
    pub fn enqueue(&self, attempt: DeployAttempt) -> Result<(), HookError> {
        self.tx.send(MonitorJob::Watch(attempt)).map_err(|e| {
            HookError::Internal(format!("monitor worker is gone, {} was dropped", describe(&e.0)))
        })
    }

    /// Hand a notification over to the worker
    pub fn enqueue_notification(&self, notification: DeployNotification) -> Result<(), HookError> {
        self.tx.send(MonitorJob::Notify(notification)).map_err(|e| {
            HookError::Internal(format!("monitor worker is gone, {} was dropped", describe(&e.0)))
        })
    }
}

fn describe(job: &MonitorJob) -> String {
    match job {
        MonitorJob::Watch(attempt) => format!("attempt {}", attempt.attempt_id),
        MonitorJob::Notify(notification) => {
            format!("notification for project {}", notification.project)
        }
    }
}

/// Run the monitor worker until shutdown or until every queue sender is gone.
///
/// Shutdown must only be signalled once nothing can enqueue anymore: jobs
/// still queued at that point were already acknowledged and are run before
/// the bounded drain.
pub async fn run(
    options: &Options,
    monitor: Arc<DeployMonitor>,
    mut jobs: mpsc::UnboundedReceiver<MonitorJob>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Monitor worker starting...");
    let mut tasks: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Monitor worker shutting down...");
                break;
            }
            job = jobs.recv() => {
                let Some(job) = job else {
                    info!("Monitor queue closed");
                    break;
                };
                spawn_job(&mut tasks, &monitor, job);
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                log_finished(joined);
            }
        }
    }

    jobs.close();
    while let Ok(job) = jobs.try_recv() {
        spawn_job(&mut tasks, &monitor, job);
    }

    if tasks.is_empty() {
        return;
    }

    info!("Waiting for {} monitor tasks...", tasks.len());
    let drain = async {
        while let Some(joined) = tasks.join_next().await {
            log_finished(joined);
        }
    };
    if tokio::time::timeout(options.drain_timeout, drain).await.is_err() {
        warn!(
            "Monitor tasks still running after {:?}, abandoning them",
            options.drain_timeout
        );
        tasks.abort_all();
    }
}

fn spawn_job(tasks: &mut JoinSet<()>, monitor: &Arc<DeployMonitor>, job: MonitorJob) {
    let monitor = monitor.clone();
    match job {
        MonitorJob::Watch(attempt) => {
            debug!(attempt_id = %attempt.attempt_id, project = %attempt.project, "Spawning deploy monitor");
            tasks.spawn(async move {
                monitor.watch(attempt).await;
            });
        }
        MonitorJob::Notify(notification) => {
            debug!(project = %notification.project, status = %notification.status, "Spawning notification");
            tasks.spawn(async move {
                monitor.notify(&notification).await;
            });
        }
    }
}

fn log_finished(joined: Result<(), JoinError>) {
    match joined {
        Ok(()) => debug!("Monitor task finished"),
        Err(e) if e.is_panic() => error!("Monitor task panicked: {}", e),
        Err(e) => warn!("Monitor task cancelled: {}", e),
    }
}
