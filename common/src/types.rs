use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use validator::Validate;

/// Epoch count every backend training run is configured with.
pub const TOTAL_EPOCHS: u32 = 15;

/// Model types the backend knows how to train.
pub const KNOWN_MODELS: [&str; 4] = ["mobilenet", "resnet", "efficientnet", "densenet"];

/// Largest image the backend accepts for upload or prediction.
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

// Training status snapshot

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    #[default]
    Pending,
    Training,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Training => "training",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ModelProgress {
    #[serde(default)]
    pub status: ModelState,
    #[serde(default)]
    pub epochs: u32,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelProgress {
    /// Share of the fixed epoch budget completed, clamped to `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        f64::from(self.epochs.min(TOTAL_EPOCHS)) / f64::from(TOTAL_EPOCHS)
    }

    pub fn accuracy_label(&self) -> String {
        format!("{:.1}%", self.accuracy)
    }

    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error occurred")
    }
}

/// One poll response from the training status endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TrainingStatus {
    #[serde(default)]
    pub is_training: bool,
    #[serde(default)]
    pub current_model: Option<String>,
    #[serde(default)]
    pub progress: HashMap<String, ModelProgress>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_models: Vec<String>,
}

impl TrainingStatus {
    pub fn has_progress(&self) -> bool {
        !self.progress.is_empty()
    }

    /// Progress entries ordered by model identifier.
    pub fn sorted_progress(&self) -> Vec<(&str, &ModelProgress)> {
        let mut entries: Vec<_> = self
            .progress
            .iter()
            .map(|(model, progress)| (model.as_str(), progress))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn count_in(&self, state: ModelState) -> usize {
        self.progress.values().filter(|p| p.status == state).count()
    }

    /// Backend start time, which is written without an offset.
    pub fn started_at(&self) -> Option<chrono::NaiveDateTime> {
        self.start_time.as_deref().and_then(|s| s.parse().ok())
    }
}

// Training control

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StartTrainingRequest {
    #[validate(length(min = 1, message = "select at least one model to train"))]
    pub models: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StartTrainingResponse {
    pub message: String,
    #[serde(default)]
    pub models: Vec<String>,
    /// Rough backend estimate, in minutes.
    #[serde(default)]
    pub estimated_time: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ControlMessage {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorReply {
    pub error: String,
}

// Dataset management

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DatasetInfo {
    #[serde(default)]
    pub classes: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_images: u64,
    #[serde(default)]
    pub num_classes: usize,
}

impl DatasetInfo {
    /// `(class, images, percent of total)` per class.
    pub fn class_shares(&self) -> Vec<(&str, u64, f64)> {
        self.classes
            .iter()
            .map(|(name, &count)| {
                let share = if self.total_images == 0 {
                    0.0
                } else {
                    count as f64 / self.total_images as f64 * 100.0
                };
                (name.as_str(), count, share)
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreateFoldersRequest {
    #[validate(length(min = 1, message = "no folders specified"))]
    pub folders: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateFoldersResponse {
    pub message: String,
    #[serde(default)]
    pub folders: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadResponse {
    pub message: String,
    #[serde(default)]
    pub uploaded_count: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// Model catalogue

/// A field the backend reports either as text ("3.5M") or as a number.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: Option<Scalar>,
    #[serde(default)]
    pub speed: Option<Scalar>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub training_status: Option<String>,
}

impl ModelInfo {
    pub fn is_available(&self) -> bool {
        self.status == "available"
    }
}

pub type ModelCatalogue = BTreeMap<String, ModelInfo>;

// Prediction

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelPrediction {
    pub model_name: String,
    #[serde(default)]
    pub model_display_name: String,
    pub predicted_class: String,
    pub confidence: f64,
    #[serde(default)]
    pub all_probabilities: BTreeMap<String, f64>,
    /// Milliseconds.
    #[serde(default)]
    pub prediction_time: f64,
    #[serde(default)]
    pub model_params: Option<Scalar>,
    #[serde(default)]
    pub model_speed: Option<Scalar>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnsemblePrediction {
    pub predicted_class: String,
    pub confidence: f64,
    #[serde(default)]
    pub model_agreement: f64,
    #[serde(default)]
    pub average_probabilities: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConfidenceAnalysis {
    #[serde(default)]
    pub avg_confidence: f64,
    #[serde(default)]
    pub confidence_level: String,
    #[serde(default)]
    pub class_consensus: bool,
    #[serde(default)]
    pub confidence_range: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    High,
    Medium,
    Low,
}

impl ConfidenceAnalysis {
    pub fn reliability(&self) -> Reliability {
        if self.class_consensus && self.avg_confidence >= 80.0 {
            Reliability::High
        } else if self.avg_confidence >= 60.0 {
            Reliability::Medium
        } else {
            Reliability::Low
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn of(confidence: f64) -> Self {
        if confidence >= 80.0 {
            Self::High
        } else if confidence >= 60.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredictionReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub individual_results: Vec<ModelPrediction>,
    #[serde(default)]
    pub ensemble_result: Option<EnsemblePrediction>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub confidence_analysis: ConfidenceAnalysis,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl PredictionReply {
    /// Individual result with the highest confidence; the first wins ties.
    pub fn best_prediction(&self) -> Option<&ModelPrediction> {
        self.individual_results.iter().fold(None, |best, current| match best {
            Some(b) if current.confidence <= b.confidence => Some(b),
            _ => Some(current),
        })
    }
}

// Analytics

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelComparison {
    pub model: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub best_accuracy: f64,
    #[serde(default)]
    pub final_accuracy: f64,
    /// Seconds.
    #[serde(default)]
    pub training_time: f64,
    #[serde(default)]
    pub total_epochs: u32,
    #[serde(default)]
    pub status: String,
}

impl ModelComparison {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ComparisonReply {
    #[serde(default)]
    pub comparison_data: Vec<ModelComparison>,
}

/// Headline numbers over the completed models of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickStats {
    pub best_model: String,
    pub best_accuracy: f64,
    pub average_accuracy: f64,
    pub total_training_time: f64,
    pub completed_models: usize,
}

impl QuickStats {
    pub fn from_comparison(data: &[ModelComparison]) -> Option<Self> {
        let completed: Vec<&ModelComparison> = data.iter().filter(|m| m.is_completed()).collect();

        let best = completed.iter().copied().fold(None::<&ModelComparison>, |best, current| {
            match best {
                Some(b) if current.best_accuracy <= b.best_accuracy => Some(b),
                _ => Some(current),
            }
        })?;

        let total_accuracy: f64 = completed.iter().map(|m| m.best_accuracy).sum();
        let total_training_time: f64 = completed.iter().map(|m| m.training_time).sum();

        Some(Self {
            best_model: best.model_name.clone(),
            best_accuracy: best.best_accuracy,
            average_accuracy: total_accuracy / completed.len() as f64,
            total_training_time,
            completed_models: completed.len(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub report_url: Option<String>,
}
