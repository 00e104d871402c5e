//! Upload lifecycle types
//!
//! [`UploadTracker`] is the per-page upload state machine:
//! `Idle -> Uploading -> {Succeeded, Failed} -> Idle`. A finished result stays
//! visible until the next upload begins or the display timeout elapses.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Simulated progress never passes this value before the server answers
pub const PROGRESS_CAP: u8 = 90;

/// Progress added per tick while uploading
pub const PROGRESS_STEP: u8 = 10;

/// How long a finished upload result stays visible
pub const DEFAULT_RESULT_DISPLAY: Duration = Duration::from_secs(10);

/// Which importer handles the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Csv,
    Excel,
}

impl UploadKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Csv => "/api/upload-csv",
            Self::Excel => "/api/upload-excel",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Csv => &["csv"],
            Self::Excel => &["xlsx", "xls"],
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Guess the importer from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        [Self::Csv, Self::Excel]
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }

    pub fn accepts(&self, path: &Path) -> bool {
        Self::from_path(path) == Some(*self)
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("CSV"),
            Self::Excel => f.write_str("Excel"),
        }
    }
}

impl FromStr for UploadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "excel" | "xlsx" | "xls" => Ok(Self::Excel),
            other => Err(format!("unknown upload kind '{}'", other)),
        }
    }
}

/// One upload attempt
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub kind: UploadKind,
    /// Grouping label for multi-section imports
    pub parent_department: Option<String>,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>, kind: UploadKind) -> Self {
        Self {
            path: path.into(),
            kind,
            parent_department: None,
        }
    }

    pub fn with_parent_department(mut self, label: impl Into<String>) -> Self {
        self.parent_department = Some(label.into());
        self
    }

    /// Parent department label, if set to something non-blank
    pub fn parent_department_label(&self) -> Option<&str> {
        self.parent_department
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// How the importer interpreted the file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    SpecialMultiSection,
    StandardTabular,
    #[serde(other)]
    Other,
}

impl FormatType {
    pub fn description(&self) -> &'static str {
        match self {
            Self::SpecialMultiSection => {
                "Special multi-section format: multiple laboratory sections and location headers"
            }
            Self::StandardTabular => "Standard tabular format",
            Self::Other => "Unrecognized format",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadSummary {
    #[serde(default)]
    pub format_type: Option<FormatType>,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Outcome of an upload as reported by the importer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<UploadSummary>,
}

impl UploadResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn success_count(&self) -> u64 {
        self.data.as_ref().map(|d| d.success_count).unwrap_or(0)
    }

    pub fn error_count(&self) -> u64 {
        self.data.as_ref().map(|d| d.error_count).unwrap_or(0)
    }

    pub fn errors(&self) -> &[String] {
        self.data.as_ref().map(|d| d.errors.as_slice()).unwrap_or(&[])
    }

    pub fn format_type(&self) -> Option<&FormatType> {
        self.data.as_ref().and_then(|d| d.format_type.as_ref())
    }

    /// One-line summary for display
    pub fn summary(&self) -> String {
        if self.success {
            self.message.clone().unwrap_or_else(|| {
                format!(
                    "{} records added, {} errors",
                    self.success_count(),
                    self.error_count()
                )
            })
        } else {
            self.error
                .clone()
                .or_else(|| self.message.clone())
                .unwrap_or_else(|| "Upload failed".to_string())
        }
    }
}

/// Observable upload state
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    Uploading { progress: u8 },
    Succeeded(UploadResult),
    Failed(UploadResult),
}

impl UploadState {
    /// Progress in percent: below 100 while uploading, exactly 100 once finished
    pub fn progress(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Uploading { progress } => *progress,
            Self::Succeeded(_) | Self::Failed(_) => 100,
        }
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self, Self::Uploading { .. })
    }

    pub fn result(&self) -> Option<&UploadResult> {
        match self {
            Self::Succeeded(r) | Self::Failed(r) => Some(r),
            _ => None,
        }
    }
}

/// Upload state machine with time-based result retention
#[derive(Debug)]
pub struct UploadTracker {
    state: UploadState,
    finished_at: Option<Instant>,
    display_timeout: Duration,
}

impl Default for UploadTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_DISPLAY)
    }
}

impl UploadTracker {
    pub fn new(display_timeout: Duration) -> Self {
        Self {
            state: UploadState::Idle,
            finished_at: None,
            display_timeout,
        }
    }

    /// Start a new attempt; any displayed result is dropped
    pub fn begin(&mut self) {
        self.state = UploadState::Uploading { progress: 0 };
        self.finished_at = None;
    }

    /// Advance simulated progress by one step, never reaching 100
    pub fn advance(&mut self) {
        if let UploadState::Uploading { progress } = &mut self.state {
            *progress = progress.saturating_add(PROGRESS_STEP).min(PROGRESS_CAP);
        }
    }

    pub fn finish(&mut self, result: UploadResult) {
        self.state = if result.success {
            UploadState::Succeeded(result)
        } else {
            UploadState::Failed(result)
        };
        self.finished_at = Some(Instant::now());
    }

    /// Current state; a finished result older than the display timeout reads as idle
    pub fn current(&self) -> UploadState {
        match self.finished_at {
            Some(at) if at.elapsed() >= self.display_timeout => UploadState::Idle,
            _ => self.state.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.state = UploadState::Idle;
        self.finished_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let mut tracker = UploadTracker::default();
        tracker.begin();
        let mut last = 0;
        for _ in 0..50 {
            tracker.advance();
            let p = tracker.current().progress();
            assert!(p >= last);
            assert!(p < 100);
            last = p;
        }
        assert_eq!(last, PROGRESS_CAP);

        tracker.finish(UploadResult {
            success: true,
            ..Default::default()
        });
        assert_eq!(tracker.current().progress(), 100);
    }

    #[test]
    fn test_result_expires_after_display_timeout() {
        let mut tracker = UploadTracker::new(Duration::ZERO);
        tracker.begin();
        tracker.finish(UploadResult::failure("boom"));
        assert_eq!(tracker.current(), UploadState::Idle);

        let mut tracker = UploadTracker::new(Duration::from_secs(3600));
        tracker.begin();
        tracker.finish(UploadResult::failure("boom"));
        assert!(matches!(tracker.current(), UploadState::Failed(_)));

        tracker.begin();
        assert_eq!(tracker.current(), UploadState::Uploading { progress: 0 });
    }

    #[test]
    fn test_advance_outside_upload_is_ignored() {
        let mut tracker = UploadTracker::default();
        tracker.advance();
        assert_eq!(tracker.current(), UploadState::Idle);
    }

    #[test]
    fn test_upload_result_decoding() {
        let result: UploadResult = serde_json::from_value(json!({
            "success": true,
            "message": "Excel processed. 12 records added, 1 errors.",
            "data": {
                "format_type": "special_multi_section",
                "success_count": 12,
                "error_count": 1,
                "errors": ["Row 4: could not convert string to float: 'N/A'"]
            }
        }))
        .unwrap();
        assert_eq!(result.success_count(), 12);
        assert_eq!(result.format_type(), Some(&FormatType::SpecialMultiSection));
        assert!(result.summary().starts_with("Excel processed"));

        let odd: UploadResult =
            serde_json::from_value(json!({"success": true, "data": {"format_type": "mystery"}}))
                .unwrap();
        assert_eq!(odd.format_type(), Some(&FormatType::Other));
        assert_eq!(odd.summary(), "0 records added, 0 errors");
    }

    #[test]
    fn test_upload_kind_from_path() {
        assert_eq!(UploadKind::from_path(Path::new("a/b.CSV")), Some(UploadKind::Csv));
        assert_eq!(UploadKind::from_path(Path::new("inventory.xls")), Some(UploadKind::Excel));
        assert_eq!(UploadKind::from_path(Path::new("notes.txt")), None);
        assert!(!UploadKind::Csv.accepts(Path::new("inventory.xlsx")));
    }

    #[test]
    fn test_parent_department_label_ignores_blank() {
        let request = UploadRequest::new("x.xlsx", UploadKind::Excel).with_parent_department("  ");
        assert_eq!(request.parent_department_label(), None);
    }
}
