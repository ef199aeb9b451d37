//! Presentation of training snapshots and backend reports.
//!
//! Nothing here holds session state: a [`ProgressSnapshot`] is a pure
//! projection of one [`TrainingStatus`], and a [`ProgressView`] only decides
//! how to show it.

use classifier_common::{ModelProgress, ModelState, TrainingStatus, TOTAL_EPOCHS};

pub mod console;
pub mod reports;

pub use console::ConsoleView;

/// The display surface a training session renders into.
pub trait ProgressView: Send + Sync {
    fn open(&self);
    fn render(&self, snapshot: &ProgressSnapshot);
    fn close(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardDetail {
    Waiting,
    Training {
        epochs: u32,
        total_epochs: u32,
        fraction: f64,
        accuracy: String,
    },
    Completed {
        accuracy: String,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelCard {
    pub model: String,
    pub state: ModelState,
    pub detail: CardDetail,
}

impl ModelCard {
    fn from_progress(model: &str, progress: &ModelProgress) -> Self {
        let detail = match progress.status {
            ModelState::Training => CardDetail::Training {
                epochs: progress.epochs,
                total_epochs: TOTAL_EPOCHS,
                fraction: progress.fraction(),
                accuracy: progress.accuracy_label(),
            },
            ModelState::Completed => CardDetail::Completed {
                accuracy: progress.accuracy_label(),
            },
            ModelState::Error => CardDetail::Failed {
                message: progress.error_message().to_string(),
            },
            ModelState::Pending | ModelState::Unknown => CardDetail::Waiting,
        };

        Self {
            model: model.to_string(),
            state: progress.status,
            detail,
        }
    }

    /// Fraction of the progress bar to fill.
    pub fn bar_fraction(&self) -> f64 {
        match &self.detail {
            CardDetail::Training { fraction, .. } => *fraction,
            CardDetail::Completed { .. } => 1.0,
            CardDetail::Waiting | CardDetail::Failed { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub is_training: bool,
    pub cards: Vec<ModelCard>,
    /// Advisory text from the backend.
    pub current_model: Option<String>,
}

impl ProgressSnapshot {
    pub fn from_status(status: &TrainingStatus) -> Self {
        let cards = status
            .sorted_progress()
            .into_iter()
            .map(|(model, progress)| ModelCard::from_progress(model, progress))
            .collect();

        Self {
            is_training: status.is_training,
            cards,
            current_model: status.current_model.clone(),
        }
    }

    /// Nothing to show yet, or a finished session without models.
    pub fn is_placeholder(&self) -> bool {
        !self.is_training && self.cards.is_empty()
    }

    pub fn card(&self, model: &str) -> Option<&ModelCard> {
        self.cards.iter().find(|card| card.model == model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_from(body: &str) -> TrainingStatus {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_training_card_progress() {
        let status = status_from(
            r#"{"is_training": true, "progress": {"mobilenet": {"status": "training", "epochs": 7, "accuracy": 62.3}}}"#,
        );

        let snapshot = ProgressSnapshot::from_status(&status);
        let card = snapshot.card("mobilenet").unwrap();

        match &card.detail {
            CardDetail::Training {
                epochs,
                total_epochs,
                fraction,
                accuracy,
            } => {
                assert_eq!((*epochs, *total_epochs), (7, 15));
                assert!((fraction - 7.0 / 15.0).abs() < 1e-12);
                assert_eq!(accuracy, "62.3%");
            }
            other => panic!("unexpected card detail {:?}", other),
        }
    }

    #[test]
    fn test_card_kinds() {
        let status = status_from(
            r#"{
                "is_training": true,
                "current_model": "resnet",
                "progress": {
                    "mobilenet": {"status": "completed", "epochs": 15, "accuracy": 91.04},
                    "resnet": {"status": "training", "epochs": 3, "accuracy": 40.0},
                    "efficientnet": {"status": "training", "epochs": 1, "accuracy": 12.5},
                    "densenet": {"status": "error", "epochs": 2, "accuracy": 0, "error": "CUDA out of memory"}
                }
            }"#,
        );

        let snapshot = ProgressSnapshot::from_status(&status);

        assert_eq!(snapshot.cards.len(), 4);
        assert_eq!(snapshot.current_model.as_deref(), Some("resnet"));
        assert_eq!(
            snapshot.card("mobilenet").unwrap().detail,
            CardDetail::Completed {
                accuracy: "91.0%".to_string()
            }
        );
        assert_eq!(
            snapshot.card("densenet").unwrap().detail,
            CardDetail::Failed {
                message: "CUDA out of memory".to_string()
            }
        );
        assert_eq!(snapshot.card("mobilenet").unwrap().bar_fraction(), 1.0);

        // Two models training at once render independently.
        assert!(matches!(snapshot.card("resnet").unwrap().detail, CardDetail::Training { epochs: 3, .. }));
        assert!(matches!(snapshot.card("efficientnet").unwrap().detail, CardDetail::Training { epochs: 1, .. }));
    }

    #[test]
    fn test_empty_snapshot_is_placeholder() {
        let idle = ProgressSnapshot::from_status(&TrainingStatus::default());
        assert!(idle.is_placeholder());

        let starting = ProgressSnapshot::from_status(&TrainingStatus {
            is_training: true,
            ..TrainingStatus::default()
        });
        assert!(!starting.is_placeholder());
    }
}
