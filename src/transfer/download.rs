//! Saving downloads to disk
//!
//! Exports and reports arrive as bytes; this is where they become files.

use crate::api::ApiResult;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// PDF reports generated by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Comprehensive,
    Summary,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comprehensive => "comprehensive",
            Self::Summary => "summary",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("/api/report/{}-pdf", self.as_str())
    }

    /// `campus_assets_summary_report_2024-03-01.pdf`
    pub fn filename(&self, date: NaiveDate) -> String {
        format!(
            "campus_assets_{}_report_{}.pdf",
            self.as_str(),
            date.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comprehensive" | "full" => Ok(Self::Comprehensive),
            "summary" => Ok(Self::Summary),
            other => Err(format!("unknown report kind '{}'", other)),
        }
    }
}

/// Write `bytes` to `dir/filename`, creating `dir` as needed
pub async fn save_bytes(dir: &Path, filename: &str, bytes: &[u8]) -> ApiResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    // Filenames are generated locally, but never let one escape `dir`
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "download".into());
    let path = dir.join(name);

    tokio::fs::write(&path, bytes).await?;
    tracing::info!("Saved {} bytes to {:?}", bytes.len(), path);
    Ok(path)
}
