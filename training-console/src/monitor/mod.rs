//! Client-side training session monitor.
//!
//! A [`TrainingMonitor`] polls the backend status endpoint on a fixed cadence
//! while a session is active, re-renders every snapshot and detects the end
//! of the session exactly once. All session state lives in the monitor
//! instance; hosts share it through an `Arc`.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    api::TrainingApi,
    config::MonitorConfig,
    error::Result,
    notify::{Notification, Notifier},
    scheduler::{RepeatingTask, Scheduler, TimerHandle},
    view::{ProgressSnapshot, ProgressView},
};
use classifier_common::{utils::format_duration, ControlMessage, TrainingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// No poll timer running.
    Idle,
    /// Poll timer active, session presumed in progress.
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed(String),
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// How long the surface stays open after a successful session.
    pub close_delay: Duration,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            close_delay: config.close_delay(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

#[derive(Default)]
struct SessionState {
    timer: Option<Box<dyn TimerHandle>>,
    pending_close: Option<Box<dyn TimerHandle>>,
    is_training: bool,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    last_outcome: Option<SessionOutcome>,
}

impl SessionState {
    fn elapsed(&self) -> String {
        self.started_at
            .and_then(|start| (Utc::now() - start).to_std().ok())
            .map(format_duration)
            .unwrap_or_else(|| "0s".to_string())
    }
}

pub struct TrainingMonitor {
    api: Arc<dyn TrainingApi>,
    scheduler: Arc<dyn Scheduler>,
    view: Arc<dyn ProgressView>,
    notifier: Arc<dyn Notifier>,
    settings: MonitorSettings,
    state: Mutex<SessionState>,
    phase_tx: watch::Sender<MonitorPhase>,
}

impl TrainingMonitor {
    pub fn new(
        api: Arc<dyn TrainingApi>,
        scheduler: Arc<dyn Scheduler>,
        view: Arc<dyn ProgressView>,
        notifier: Arc<dyn Notifier>,
        settings: MonitorSettings,
    ) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(MonitorPhase::Idle);

        Arc::new(Self {
            api,
            scheduler,
            view,
            notifier,
            settings,
            state: Mutex::new(SessionState::default()),
            phase_tx,
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begins a session. Call once the backend has accepted a training request.
    pub fn start(self: &Arc<Self>) {
        let monitor = Arc::downgrade(self);
        let task: RepeatingTask = Arc::new(move || {
            let monitor = monitor.clone();
            async move {
                if let Some(monitor) = monitor.upgrade() {
                    monitor.poll().await;
                }
            }
            .boxed()
        });

        let session_id = Uuid::new_v4();
        {
            let mut state = self.state();

            if let Some(previous) = state.timer.take() {
                previous.cancel();
                debug!("Replaced poll timer of session {:?}", state.session_id);
            }
            if let Some(close) = state.pending_close.take() {
                close.cancel();
            }

            state.timer = Some(self.scheduler.repeat(self.settings.poll_interval, task));
            state.is_training = true;
            state.session_id = Some(session_id);
            state.started_at = Some(Utc::now());
            state.last_outcome = None;
        }

        self.phase_tx.send_replace(MonitorPhase::Polling);
        self.view.open();

        info!(
            %session_id,
            "Training monitor started, polling every {:?}",
            self.settings.poll_interval
        );
    }

    /// Fetches one snapshot. Transport failures are logged and left for the
    /// next scheduled poll to retry.
    pub async fn poll(&self) -> Option<SessionOutcome> {
        match self.api.training_status().await {
            Ok(status) => self.on_poll_result(&status),
            Err(e) if e.is_transport() => {
                warn!("Error checking training status: {}", e);
                None
            }
            Err(e) => {
                warn!("Backend rejected status request: {}", e);
                None
            }
        }
    }

    /// Applies one snapshot and returns the terminal outcome if this snapshot
    /// ended the session.
    pub fn on_poll_result(&self, status: &TrainingStatus) -> Option<SessionOutcome> {
        self.view.render(&ProgressSnapshot::from_status(status));

        if status.is_training {
            debug!(
                current_model = status.current_model.as_deref().unwrap_or("-"),
                "Training in progress"
            );
            return None;
        }

        let (outcome, notification) = {
            let mut state = self.state();
            let timer = state.timer.take()?;
            timer.cancel();
            state.is_training = false;

            let (outcome, notification) = match &status.error {
                Some(error) => (
                    SessionOutcome::Failed(error.clone()),
                    Notification::failure(format!("Training stopped with error: {}", error)),
                ),
                None => {
                    let view = self.view.clone();
                    state.pending_close = Some(
                        self.scheduler
                            .delay(self.settings.close_delay, async move { view.close() }.boxed()),
                    );
                    (
                        SessionOutcome::Completed,
                        Notification::success("Training completed successfully!"),
                    )
                }
            };

            info!(
                session_id = ?state.session_id,
                elapsed = %state.elapsed(),
                "Training session ended: {:?}",
                outcome
            );
            state.last_outcome = Some(outcome.clone());
            (outcome, notification)
        };

        self.phase_tx.send_replace(MonitorPhase::Idle);
        self.notifier.notify(notification);
        Some(outcome)
    }

    /// One-off status fetch outside the poll cadence.
    pub async fn refresh(&self) -> Result<TrainingStatus> {
        let status = self.api.training_status().await?;
        self.on_poll_result(&status);
        Ok(status)
    }

    /// Cancels the session locally whatever the backend answers.
    pub async fn stop(&self) -> Result<ControlMessage> {
        let result = self.api.stop_training().await;

        {
            let mut state = self.state();
            let had_timer = match state.timer.take() {
                Some(timer) => {
                    timer.cancel();
                    true
                }
                None => false,
            };
            if let Some(close) = state.pending_close.take() {
                close.cancel();
            }
            state.is_training = false;
            if had_timer {
                state.last_outcome = Some(SessionOutcome::Stopped);
            }
            info!(session_id = ?state.session_id, elapsed = %state.elapsed(), "Training monitor stopped");
        }

        self.phase_tx.send_replace(MonitorPhase::Idle);
        self.view.close();

        match &result {
            Ok(reply) => self.notifier.notify(Notification::warning(reply.message.clone())),
            Err(e) => {
                warn!("Stop request failed: {}", e);
                self.notifier.notify(Notification::failure(format!(
                    "Error stopping training: {}. Monitoring stopped locally.",
                    e
                )));
            }
        }

        result
    }

    pub fn phase(&self) -> MonitorPhase {
        *self.phase_tx.borrow()
    }

    pub fn is_training(&self) -> bool {
        self.state().is_training
    }

    pub fn has_active_timer(&self) -> bool {
        self.state()
            .timer
            .as_ref()
            .map(|timer| timer.is_active())
            .unwrap_or(false)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.state().session_id
    }

    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.state().last_outcome.clone()
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorPhase> {
        self.phase_tx.subscribe()
    }

    /// Resolves once the monitor is idle.
    pub async fn wait_until_idle(&self) {
        let mut phase = self.subscribe();
        let _ = phase.wait_for(|phase| *phase == MonitorPhase::Idle).await;
    }
}
