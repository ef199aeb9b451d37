use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use classifier_common::{
    ControlMessage, ModelProgress, ModelState, StartTrainingRequest, StartTrainingResponse,
    TrainingStatus,
};
use training_console::{
    api::TrainingApi,
    commands::launch_training,
    error::{ConsoleError, Result},
    notify::{Notification, NotificationKind, Notifier},
    scheduler::ManualScheduler,
    view::{console::render_progress, ProgressSnapshot, ProgressView},
    MonitorPhase, MonitorSettings, SessionOutcome, TrainingMonitor,
};

/// Plays back a scripted backend: every poll consumes the next snapshot and
/// the last one repeats.
struct ScriptedBackend {
    snapshots: Mutex<VecDeque<TrainingStatus>>,
    polls: Mutex<usize>,
}

impl ScriptedBackend {
    fn new(snapshots: Vec<TrainingStatus>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into()),
            polls: Mutex::new(0),
        }
    }

    fn polls(&self) -> usize {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl TrainingApi for ScriptedBackend {
    async fn start_training(&self, request: &StartTrainingRequest) -> Result<StartTrainingResponse> {
        Ok(StartTrainingResponse {
            message: "Training started successfully".to_string(),
            models: request.models.clone(),
            estimated_time: Some(20),
        })
    }

    async fn training_status(&self) -> Result<TrainingStatus> {
        *self.polls.lock().unwrap() += 1;
        let mut snapshots = self.snapshots.lock().unwrap();
        let snapshot = if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        };
        snapshot.ok_or_else(|| ConsoleError::Transport("backend offline".to_string()))
    }

    async fn stop_training(&self) -> Result<ControlMessage> {
        Ok(ControlMessage {
            message: "Training stop signal sent".to_string(),
        })
    }
}

#[derive(Default)]
struct TextView {
    frames: Mutex<Vec<String>>,
    open: Mutex<bool>,
}

impl ProgressView for TextView {
    fn open(&self) {
        *self.open.lock().unwrap() = true;
    }

    fn render(&self, snapshot: &ProgressSnapshot) {
        self.frames.lock().unwrap().push(render_progress(snapshot));
    }

    fn close(&self) {
        *self.open.lock().unwrap() = false;
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<Notification>>);

impl Notifier for Inbox {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

fn snapshot(is_training: bool, models: &[(&str, ModelState, u32, f64)], error: Option<&str>) -> TrainingStatus {
    let mut status = TrainingStatus {
        is_training,
        error: error.map(str::to_string),
        current_model: models
            .iter()
            .find(|(_, state, _, _)| *state == ModelState::Training)
            .map(|(model, _, _, _)| model.to_string()),
        ..TrainingStatus::default()
    };
    for (model, state, epochs, accuracy) in models {
        status.progress.insert(
            model.to_string(),
            ModelProgress {
                status: *state,
                epochs: *epochs,
                accuracy: *accuracy,
                error: None,
            },
        );
    }
    status
}

struct Session {
    backend: Arc<ScriptedBackend>,
    scheduler: ManualScheduler,
    view: Arc<TextView>,
    inbox: Arc<Inbox>,
    monitor: Arc<TrainingMonitor>,
}

fn session(snapshots: Vec<TrainingStatus>) -> Session {
    let backend = Arc::new(ScriptedBackend::new(snapshots));
    let scheduler = ManualScheduler::new();
    let view = Arc::new(TextView::default());
    let inbox = Arc::new(Inbox::default());
    let monitor = TrainingMonitor::new(
        backend.clone(),
        Arc::new(scheduler.clone()),
        view.clone(),
        inbox.clone(),
        MonitorSettings {
            poll_interval: Duration::from_millis(2000),
            close_delay: Duration::from_millis(3000),
        },
    );

    Session {
        backend,
        scheduler,
        view,
        inbox,
        monitor,
    }
}

#[tokio::test]
async fn successful_session_runs_to_completion() {
    let s = session(vec![
        snapshot(true, &[("mobilenet", ModelState::Training, 3, 41.0), ("resnet", ModelState::Pending, 0, 0.0)], None),
        snapshot(true, &[("mobilenet", ModelState::Completed, 15, 90.5), ("resnet", ModelState::Training, 2, 30.0)], None),
        snapshot(false, &[("mobilenet", ModelState::Completed, 15, 90.5), ("resnet", ModelState::Completed, 15, 88.0)], None),
    ]);

    launch_training(
        s.backend.as_ref(),
        &s.monitor,
        s.inbox.as_ref(),
        vec!["mobilenet".to_string(), "resnet".to_string()],
    )
    .await
    .unwrap();
    assert!(*s.view.open.lock().unwrap());

    s.scheduler.advance(Duration::from_secs(6)).await;

    assert_eq!(s.backend.polls(), 3);
    assert_eq!(s.monitor.phase(), MonitorPhase::Idle);
    assert_eq!(s.monitor.last_outcome(), Some(SessionOutcome::Completed));

    let frames = s.view.frames.lock().unwrap().clone();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].contains("Epoch: 3/15  Accuracy: 41.0%"));
    assert!(frames[1].contains("Currently training: RESNET"));
    assert!(frames[2].contains("Final Accuracy: 88.0%"));

    // Surface closes only after the delay; polling has ended.
    assert!(*s.view.open.lock().unwrap());
    s.scheduler.advance(Duration::from_secs(3)).await;
    assert!(!*s.view.open.lock().unwrap());
    assert_eq!(s.backend.polls(), 3);

    let inbox = s.inbox.0.lock().unwrap().clone();
    assert_eq!(
        inbox,
        vec![
            Notification::success("Training started successfully"),
            Notification::success("Training completed successfully!"),
        ]
    );
}

#[tokio::test]
async fn failed_session_reports_once_and_stays_open() {
    let s = session(vec![
        snapshot(true, &[("densenet", ModelState::Training, 1, 10.0)], None),
        snapshot(false, &[("densenet", ModelState::Error, 1, 10.0)], Some("CUDA out of memory")),
    ]);

    launch_training(s.backend.as_ref(), &s.monitor, s.inbox.as_ref(), vec!["densenet".to_string()])
        .await
        .unwrap();
    s.scheduler.advance(Duration::from_secs(30)).await;

    assert_eq!(s.backend.polls(), 2);
    assert_eq!(
        s.monitor.last_outcome(),
        Some(SessionOutcome::Failed("CUDA out of memory".to_string()))
    );
    assert!(*s.view.open.lock().unwrap());

    let inbox = s.inbox.0.lock().unwrap().clone();
    let failures: Vec<_> = inbox
        .iter()
        .filter(|n| n.kind == NotificationKind::Failure)
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message, "Training stopped with error: CUDA out of memory");
}

#[tokio::test]
async fn stop_mid_session_ignores_late_snapshot() {
    let s = session(vec![snapshot(true, &[("efficientnet", ModelState::Training, 4, 55.0)], None)]);

    launch_training(s.backend.as_ref(), &s.monitor, s.inbox.as_ref(), vec!["efficientnet".to_string()])
        .await
        .unwrap();
    s.scheduler.advance(Duration::from_secs(4)).await;
    assert_eq!(s.backend.polls(), 2);

    s.monitor.stop().await.unwrap();
    assert_eq!(s.monitor.phase(), MonitorPhase::Idle);
    assert_eq!(s.monitor.last_outcome(), Some(SessionOutcome::Stopped));

    // A response that was still in flight lands after the stop.
    let late = snapshot(false, &[("efficientnet", ModelState::Completed, 15, 80.0)], None);
    assert_eq!(s.monitor.on_poll_result(&late), None);

    s.scheduler.advance(Duration::from_secs(10)).await;
    assert_eq!(s.backend.polls(), 2);

    let inbox = s.inbox.0.lock().unwrap().clone();
    assert_eq!(inbox.last(), Some(&Notification::warning("Training stop signal sent")));
    assert!(!inbox.contains(&Notification::success("Training completed successfully!")));
}
