//! Command handlers behind the `classifier-console` subcommands.

use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use crate::{
    api::ClassifierClient,
    config::ConsoleConfig,
    error::Result,
    monitor::{MonitorSettings, TrainingMonitor},
    notify::Notifier,
    scheduler::Scheduler,
    view::ProgressView,
};

pub mod analytics;
pub mod dataset;
pub mod predict;
pub mod train;

pub use train::{launch_training, select_models};

/// Everything a command needs to talk to the backend.
#[derive(Clone)]
pub struct CommandContext {
    pub client: Arc<ClassifierClient>,
    pub notifier: Arc<dyn Notifier>,
    pub config: ConsoleConfig,
}

impl CommandContext {
    pub fn new(config: ConsoleConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let client = Arc::new(ClassifierClient::new(&config.backend)?);
        info!("Using classifier backend at {}", client.base_url());

        Ok(Self {
            client,
            notifier,
            config,
        })
    }

    pub fn monitor(
        &self,
        scheduler: Arc<dyn Scheduler>,
        view: Arc<dyn ProgressView>,
    ) -> Arc<TrainingMonitor> {
        TrainingMonitor::new(
            self.client.clone(),
            scheduler,
            view,
            self.notifier.clone(),
            MonitorSettings::from(&self.config.monitor),
        )
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
