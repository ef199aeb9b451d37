use async_trait::async_trait;

use crate::error::Result;
use classifier_common::{ControlMessage, StartTrainingRequest, StartTrainingResponse, TrainingStatus};

pub mod client;

pub use client::{ClassifierClient, DownloadKind};

/// Training control surface of the backend.
#[async_trait]
pub trait TrainingApi: Send + Sync {
    async fn start_training(&self, request: &StartTrainingRequest) -> Result<StartTrainingResponse>;
    async fn training_status(&self) -> Result<TrainingStatus>;
    async fn stop_training(&self) -> Result<ControlMessage>;
}

/// Binary artifacts the backend may or may not have produced yet.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Whether the artifact exists, without fetching it.
    async fn probe_artifact(&self, kind: DownloadKind, name: &str) -> Result<bool>;
    async fn fetch_artifact(&self, kind: DownloadKind, name: &str) -> Result<Vec<u8>>;
}
