use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

use super::{shutdown_signal, CommandContext};
use crate::{
    api::TrainingApi,
    error::{ConsoleError, Result},
    monitor::{SessionOutcome, TrainingMonitor},
    notify::{Notification, Notifier},
    scheduler::TokioScheduler,
    view::ConsoleView,
};
use classifier_common::{ModelState, StartTrainingRequest, StartTrainingResponse, KNOWN_MODELS};

/// Model list for a training request. `all` selects every known model;
/// otherwise duplicates are dropped and order is kept.
pub fn select_models(models: &[String], all: bool) -> Vec<String> {
    if all {
        return KNOWN_MODELS.iter().map(|model| model.to_string()).collect();
    }

    let mut selected: Vec<String> = Vec::with_capacity(models.len());
    for model in models {
        let model = model.trim().to_lowercase();
        if !model.is_empty() && !selected.contains(&model) {
            selected.push(model);
        }
    }
    selected
}

/// Asks the backend to start training and begins monitoring once it accepts.
pub async fn launch_training(
    api: &dyn TrainingApi,
    monitor: &Arc<TrainingMonitor>,
    notifier: &dyn Notifier,
    models: Vec<String>,
) -> Result<StartTrainingResponse> {
    let request = StartTrainingRequest { models };
    if let Err(e) = request.validate() {
        notifier.notify(Notification::failure("Please select at least one model to train"));
        return Err(e.into());
    }

    match api.start_training(&request).await {
        Ok(reply) => {
            info!(
                models = ?reply.models,
                estimated_minutes = ?reply.estimated_time,
                "Training accepted by backend"
            );
            notifier.notify(Notification::success(reply.message.clone()));
            monitor.start();
            Ok(reply)
        }
        Err(ConsoleError::Backend { message, status }) => {
            error!(status, "Backend refused training request: {}", message);
            notifier.notify(Notification::failure(message.clone()));
            Err(ConsoleError::Backend { status, message })
        }
        Err(e) => {
            error!("Error starting training: {}", e);
            notifier.notify(Notification::failure(format!("Error starting training: {}", e)));
            Err(e)
        }
    }
}

/// Runs one training session to its end, stopping it on Ctrl+C.
pub async fn run_train(ctx: &CommandContext, models: &[String], all: bool) -> Result<()> {
    let monitor = ctx.monitor(Arc::new(TokioScheduler::new()), Arc::new(ConsoleView::new()));
    let selected = select_models(models, all);

    launch_training(ctx.client.as_ref(), &monitor, ctx.notifier.as_ref(), selected).await?;

    tokio::select! {
        _ = monitor.wait_until_idle() => {}
        _ = shutdown_signal() => {
            info!("Interrupted, stopping training");
            monitor.stop().await?;
            return Ok(());
        }
    }

    match monitor.last_outcome() {
        Some(SessionOutcome::Completed) => {
            // Let the surface close on its own schedule.
            tokio::time::sleep(monitor.settings().close_delay).await;
            Ok(())
        }
        Some(SessionOutcome::Failed(message)) => Err(ConsoleError::TrainingFailed(message)),
        Some(SessionOutcome::Stopped) | None => Ok(()),
    }
}

/// Prints one status snapshot without starting a session.
pub async fn run_status(ctx: &CommandContext) -> Result<()> {
    let monitor = ctx.monitor(Arc::new(TokioScheduler::new()), Arc::new(ConsoleView::new()));
    let status = monitor.refresh().await?;

    if status.has_progress() {
        let finished = status
            .progress
            .values()
            .filter(|progress| progress.status.is_finished())
            .count();
        println!(
            "{}/{} models finished ({} completed, {} failed)",
            finished,
            status.progress.len(),
            status.count_in(ModelState::Completed),
            status.count_in(ModelState::Error)
        );
    }
    if let Some(started) = status.started_at() {
        println!("Started at: {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if !status.selected_models.is_empty() {
        println!("Selected models: {}", status.selected_models.join(", "));
    }
    if let Some(error) = &status.error {
        println!("Last error: {}", error);
    }

    Ok(())
}

pub async fn run_stop(ctx: &CommandContext) -> Result<()> {
    let monitor = ctx.monitor(Arc::new(TokioScheduler::new()), Arc::new(ConsoleView::new()));
    monitor.stop().await.map(|_| ())
}
