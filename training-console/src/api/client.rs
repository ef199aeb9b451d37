use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

use super::{ArtifactSource, TrainingApi};
use crate::{
    config::BackendConfig,
    error::{ConsoleError, Result},
};
use classifier_common::{
    utils::{format_file_size, is_image_file},
    ComparisonReply, ControlMessage, CreateFoldersRequest, CreateFoldersResponse, DatasetInfo,
    ErrorReply, ModelCatalogue, PredictionReply, ReportReply, StartTrainingRequest,
    StartTrainingResponse, TrainingStatus, UploadResponse, KNOWN_MODELS, MAX_UPLOAD_BYTES,
};

/// Binary artifacts the backend serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Model,
    Metrics,
    Plot,
}

impl DownloadKind {
    pub fn path(&self, name: &str) -> String {
        match self {
            Self::Model => format!("/api/download/model/{}", name),
            Self::Metrics => format!("/api/download/metrics/{}", name),
            Self::Plot => format!("/api/analytics/plots/{}", name),
        }
    }

    pub fn file_name(&self, name: &str) -> String {
        match self {
            Self::Model => format!("{}_model.h5", name),
            Self::Metrics => format!("{}_metrics.json", name),
            Self::Plot => format!("{}.png", name),
        }
    }

    /// Names a bulk download probes: every known model, or for plots the
    /// comparison chart followed by each model's training history.
    pub fn bulk_names(&self) -> Vec<String> {
        match self {
            Self::Model | Self::Metrics => KNOWN_MODELS.iter().map(|model| model.to_string()).collect(),
            Self::Plot => std::iter::once("model_comparison".to_string())
                .chain(KNOWN_MODELS.iter().map(|model| format!("{}_training_history", model)))
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct ClassifierClient {
    http: Client,
    base_url: String,
}

impl ClassifierClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_reply<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self.http.get(self.url(path)).send().await?;
        read_reply(response).await
    }

    // Dataset management

    pub async fn dataset_info(&self) -> Result<DatasetInfo> {
        self.get_reply("/api/dataset_info").await
    }

    pub async fn create_folders(&self, request: &CreateFoldersRequest) -> Result<CreateFoldersResponse> {
        request.validate()?;

        let response = self
            .http
            .post(self.url("/api/create_folders"))
            .json(request)
            .send()
            .await?;

        read_reply(response).await
    }

    /// Uploads `files` into the class folder `folder`.
    pub async fn upload_images(&self, folder: &str, files: &[PathBuf]) -> Result<UploadResponse> {
        if files.is_empty() {
            return Err(ConsoleError::Validation("no images provided".to_string()));
        }

        let mut form = Form::new();
        for path in files {
            check_image(path).await?;
            form = form
                .part("images", file_part(path).await?)
                .text("folder_names", folder.to_string());
        }

        let response = self
            .http
            .post(self.url("/api/upload_images"))
            .multipart(form)
            .send()
            .await?;

        read_reply(response).await
    }

    // Models and prediction

    pub async fn available_models(&self) -> Result<ModelCatalogue> {
        self.get_reply("/api/models/available").await
    }

    pub async fn predict(&self, image: &Path) -> Result<PredictionReply> {
        let size = check_image(image).await?;
        debug!("Uploading {} ({}) for prediction", image.display(), format_file_size(size));

        let form = Form::new().part("image", file_part(image).await?);
        let response = self
            .http
            .post(self.url("/api/predict"))
            .multipart(form)
            .send()
            .await?;

        read_reply(response).await
    }

    // Analytics

    pub async fn model_comparison(&self) -> Result<ComparisonReply> {
        self.get_reply("/api/analytics/comparison").await
    }

    pub async fn model_metrics(&self, model: &str) -> Result<serde_json::Value> {
        self.get_reply(&format!("/api/analytics/metrics/{}", model)).await
    }

    pub async fn generate_report(&self) -> Result<ReportReply> {
        self.get_reply("/api/analytics/generate_report").await
    }

    // Downloads

    pub async fn download(&self, kind: DownloadKind, name: &str) -> Result<Vec<u8>> {
        let path = kind.path(name);
        debug!("GET {}", path);

        let response = self.http.get(self.url(&path)).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        Ok(body.to_vec())
    }

    /// Probes an artifact without fetching it.
    pub async fn is_downloadable(&self, kind: DownloadKind, name: &str) -> Result<bool> {
        let response = self.http.head(self.url(&kind.path(name))).send().await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl ArtifactSource for ClassifierClient {
    async fn probe_artifact(&self, kind: DownloadKind, name: &str) -> Result<bool> {
        self.is_downloadable(kind, name).await
    }

    async fn fetch_artifact(&self, kind: DownloadKind, name: &str) -> Result<Vec<u8>> {
        self.download(kind, name).await
    }
}

#[async_trait]
impl TrainingApi for ClassifierClient {
    async fn start_training(&self, request: &StartTrainingRequest) -> Result<StartTrainingResponse> {
        request.validate()?;

        let response = self
            .http
            .post(self.url("/api/start_training"))
            .json(request)
            .send()
            .await?;

        read_reply(response).await
    }

    async fn training_status(&self) -> Result<TrainingStatus> {
        let response = self.http.get(self.url("/api/training_status")).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        decode_snapshot(status, &body)
    }

    async fn stop_training(&self) -> Result<ControlMessage> {
        let response = self.http.post(self.url("/api/stop_training")).send().await?;
        read_reply(response).await
    }
}

async fn read_reply<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    decode_reply(status, &body)
}

fn error_from_body(status: StatusCode, body: &[u8]) -> ConsoleError {
    match serde_json::from_slice::<ErrorReply>(body) {
        Ok(reply) => ConsoleError::Backend {
            status: status.as_u16(),
            message: reply.error,
        },
        Err(_) => ConsoleError::Status(status.as_u16()),
    }
}

/// Decodes a control or query reply. An `{"error": ..}` body is an
/// application error whatever the HTTP status.
pub(crate) fn decode_reply<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if let Ok(reply) = serde_json::from_slice::<ErrorReply>(body) {
        return Err(ConsoleError::Backend {
            status: status.as_u16(),
            message: reply.error,
        });
    }

    if !status.is_success() {
        return Err(ConsoleError::Status(status.as_u16()));
    }

    Ok(serde_json::from_slice(body)?)
}

/// Decodes a training status snapshot, whose own `error` field is data.
pub(crate) fn decode_snapshot(status: StatusCode, body: &[u8]) -> Result<TrainingStatus> {
    if !status.is_success() {
        return Err(error_from_body(status, body));
    }

    Ok(serde_json::from_slice(body)?)
}

async fn check_image(path: &Path) -> Result<u64> {
    if !is_image_file(path) {
        return Err(ConsoleError::Validation(format!(
            "{} is not a supported image file",
            path.display()
        )));
    }

    let size = tokio::fs::metadata(path).await?.len();
    if size > MAX_UPLOAD_BYTES {
        return Err(ConsoleError::Validation(format!(
            "{} is {}; maximum size is {}",
            path.display(),
            format_file_size(size),
            format_file_size(MAX_UPLOAD_BYTES)
        )));
    }

    Ok(size)
}

async fn file_part(path: &Path) -> Result<Part> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(Part::bytes(data)
        .file_name(file_name)
        .mime_str(image_mime(path).as_ref())?)
}

fn image_mime(path: &Path) -> mime::Mime {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("bmp") => mime::IMAGE_BMP,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_wins_over_status() {
        let body = br#"{"error": "Training is already in progress"}"#;

        let result: Result<StartTrainingResponse> = decode_reply(StatusCode::BAD_REQUEST, body);
        match result {
            Err(ConsoleError::Backend { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Training is already in progress");
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_failure_is_transport_error() {
        let result: Result<ControlMessage> =
            decode_reply(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");

        let error = result.unwrap_err();
        assert!(matches!(error, ConsoleError::Status(502)));
        assert!(error.is_transport());
    }

    #[test]
    fn test_malformed_success_body_is_decode_error() {
        let result: Result<ControlMessage> = decode_reply(StatusCode::OK, b"{not json");

        assert!(matches!(result, Err(ConsoleError::Decode(_))));
    }

    #[test]
    fn test_snapshot_error_field_is_data() {
        let body = br#"{"is_training": false, "current_model": null, "progress": {}, "error": "out of memory"}"#;

        let snapshot = decode_snapshot(StatusCode::OK, body).unwrap();
        assert!(!snapshot.is_training);
        assert_eq!(snapshot.error.as_deref(), Some("out of memory"));
    }

    #[test]
    fn test_snapshot_failure_status() {
        let result = decode_snapshot(StatusCode::INTERNAL_SERVER_ERROR, b"");
        assert!(matches!(result, Err(ConsoleError::Status(500))));
    }

    #[test]
    fn test_download_paths() {
        assert_eq!(DownloadKind::Model.path("resnet"), "/api/download/model/resnet");
        assert_eq!(DownloadKind::Model.file_name("resnet"), "resnet_model.h5");
        assert_eq!(DownloadKind::Metrics.file_name("densenet"), "densenet_metrics.json");
        assert_eq!(
            DownloadKind::Plot.path("comprehensive_training_report"),
            "/api/analytics/plots/comprehensive_training_report"
        );
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("a.JPEG")), mime::IMAGE_JPEG);
        assert_eq!(image_mime(Path::new("a.png")), mime::IMAGE_PNG);
        assert_eq!(image_mime(Path::new("a.tiff")), mime::APPLICATION_OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_check_image_rejects_non_images() {
        let result = check_image(Path::new("Cargo.toml")).await;
        assert!(matches!(result, Err(ConsoleError::Validation(_))));
    }

    #[test]
    fn test_bulk_names() {
        assert_eq!(DownloadKind::Metrics.bulk_names(), KNOWN_MODELS.to_vec());
        assert_eq!(
            DownloadKind::Plot.bulk_names(),
            vec![
                "model_comparison",
                "mobilenet_training_history",
                "resnet_training_history",
                "efficientnet_training_history",
                "densenet_training_history",
            ]
        );
    }

    #[tokio::test]
    async fn test_predict_missing_image_fails_before_request() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_sec: 1,
        };
        let client = ClassifierClient::new(&config).unwrap();

        let result = client.predict(Path::new("no/such/photo.png")).await;

        match result {
            Err(ConsoleError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected missing file error, got {:?}", other),
        }
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = BackendConfig {
            base_url: "http://localhost:5000/".to_string(),
            request_timeout_sec: 5,
        };

        let client = ClassifierClient::new(&config).unwrap();
        assert_eq!(client.url("/api/training_status"), "http://localhost:5000/api/training_status");
    }
}
