//! File import and export
//!
//! - [`upload`] - Upload kinds, results and the upload state machine
//! - [`download`] - Report kinds and saving bytes to disk
//! - [`orchestrator`] - Runs uploads with progress and saves exports/reports

pub mod download;
pub mod orchestrator;
pub mod upload;

pub use download::{save_bytes, ReportKind};
pub use orchestrator::TransferOrchestrator;
pub use upload::{FormatType, UploadKind, UploadRequest, UploadResult, UploadState, UploadTracker};
