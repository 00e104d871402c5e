//! Upload/Export Orchestrator
//!
//! Drives file imports (with simulated progress) and turns exports and
//! reports into files on disk.

use super::download::{save_bytes, ReportKind};
use super::upload::{
    UploadRequest, UploadResult, UploadState, UploadTracker, DEFAULT_RESULT_DISPLAY,
};
use crate::api::http::{Body, ParsedResponse};
use crate::api::{ApiClient, ApiError, ApiResult};
use crate::resource::{ExportFormat, ResourceClient};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Interval between simulated progress steps
const DEFAULT_TICK: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct TransferOrchestrator {
    resources: ResourceClient,
    tracker: Arc<RwLock<UploadTracker>>,
    tick: Duration,
    require_parent_department: bool,
}

impl TransferOrchestrator {
    pub fn new(api: ApiClient) -> Self {
        Self {
            resources: ResourceClient::new(api),
            tracker: Arc::new(RwLock::new(UploadTracker::new(DEFAULT_RESULT_DISPLAY))),
            tick: DEFAULT_TICK,
            require_parent_department: false,
        }
    }

    /// How long a finished result stays visible
    pub fn with_result_display(self, display: Duration) -> Self {
        Self {
            tracker: Arc::new(RwLock::new(UploadTracker::new(display))),
            ..self
        }
    }

    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    /// Reject uploads that carry no parent department label
    pub fn require_parent_department(mut self, required: bool) -> Self {
        self.require_parent_department = required;
        self
    }

    pub async fn state(&self) -> UploadState {
        self.tracker.read().await.current()
    }

    /// Clear a displayed result immediately
    pub async fn dismiss(&self) {
        self.tracker.write().await.reset();
    }

    fn validate(&self, request: &UploadRequest) -> ApiResult<()> {
        if self.require_parent_department && request.parent_department_label().is_none() {
            return Err(ApiError::Validation(
                "Select a parent department before uploading".to_string(),
            ));
        }
        if !request.kind.accepts(&request.path) {
            return Err(ApiError::Validation(format!(
                "{} import expects a .{} file",
                request.kind,
                request.kind.extensions().join(" or .")
            )));
        }
        Ok(())
    }

    async fn read_file(path: &Path) -> ApiResult<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::Validation(
                format!("File not found: {}", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Upload a file to the importer.
    ///
    /// Local validation failures and authentication failures are returned as
    /// errors. Everything the server (or the network) does wrong is folded
    /// into a failed [`UploadResult`], which is also what the state shows.
    pub async fn upload(&self, request: UploadRequest) -> ApiResult<UploadResult> {
        self.validate(&request)?;
        self.resources.api().session.require_token().await?;
        let bytes = Self::read_file(&request.path).await?;

        let file_name = request
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        tracing::info!(
            "Uploading {} ({} bytes) to {} importer",
            file_name,
            bytes.len(),
            request.kind
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(request.kind.mime_type())
            .map_err(ApiError::Transport)?;
        let mut form = Form::new().part("file", part);
        if let Some(label) = request.parent_department_label() {
            form = form.text("parent_department", label.to_string());
        }

        self.tracker.write().await.begin();

        let send = self.resources.api().post_multipart(request.kind.endpoint(), form);
        tokio::pin!(send);
        let mut ticker = tokio::time::interval(self.tick);
        let outcome = loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                _ = ticker.tick() => self.tracker.write().await.advance(),
            }
        };

        let result = match outcome {
            Ok(parsed) => interpret_upload_response(parsed),
            Err(ApiError::Unauthenticated) => {
                self.tracker
                    .write()
                    .await
                    .finish(UploadResult::failure("Session expired, please log in again"));
                return Err(ApiError::Unauthenticated);
            }
            Err(e) => UploadResult::failure(format!("Upload failed: {}", e)),
        };

        if result.success {
            tracing::info!("Upload finished: {}", result.summary());
        } else {
            tracing::warn!("Upload failed: {}", result.summary());
        }
        self.tracker.write().await.finish(result.clone());
        Ok(result)
    }

    /// Download an export and save it as `resources_export.{csv,xlsx}` in `dir`.
    /// Nothing is written when the backend reports an error.
    pub async fn download(&self, format: ExportFormat, dir: &Path) -> ApiResult<PathBuf> {
        let export = self.resources.export_as(format).await?;
        save_bytes(dir, &export.filename(), &export.bytes).await
    }

    /// Download a PDF report into `dir`
    pub async fn download_report(&self, kind: ReportKind, dir: &Path) -> ApiResult<PathBuf> {
        let response = self.resources.api().get_bytes(&kind.endpoint()).await?;
        let filename = kind.filename(chrono::Local::now().date_naive());
        save_bytes(dir, &filename, &response.bytes).await
    }
}

/// Turn the importer's answer into an [`UploadResult`]
fn interpret_upload_response(parsed: ParsedResponse) -> UploadResult {
    let status = parsed.status;
    match parsed.body {
        Body::Json(value) => match serde_json::from_value::<UploadResult>(value.clone()) {
            Ok(mut result) => {
                if !status.is_success() {
                    result.success = false;
                    if result.error.is_none() {
                        result.error = crate::api::http::error_message(&value)
                            .or_else(|| Some(format!("Server returned {}", status.as_u16())));
                    }
                }
                result
            }
            Err(e) => UploadResult::failure(format!(
                "Upload failed: unexpected response from server ({})",
                e
            )),
        },
        Body::Text { content_type, .. } => UploadResult::failure(format!(
            "Upload failed: Server returned {}: Expected JSON but got {}",
            status.as_u16(),
            content_type
        )),
        Body::Empty => UploadResult::failure(format!(
            "Upload failed: Server returned {} with an empty body",
            status.as_u16()
        )),
    }
}
