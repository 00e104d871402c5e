//! Resource Client
//!
//! Typed operations on `/api/resources` and the endpoints that feed the
//! resource pages (filter options, statistics, export). Nothing is cached:
//! every view re-fetches.

use super::model::{FilterOptions, Resource, ResourceFields, ResourcePage};
use super::query::{build_query, FilterSet, PageRequest, QueryParams};
use super::stats::{sanitize_stats, DashboardStats};
use crate::api::client::{decode, extract_data, ApiClient};
use crate::api::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const RESOURCES_PATH: &str = "/api/resources";

/// Export file formats offered by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    /// Name used in the endpoint path
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("/api/export-{}", self.as_str())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "excel" | "xlsx" | "xls" => Ok(Self::Excel),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

/// A downloaded export, not yet written anywhere
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl ExportFile {
    /// `resources_export.csv` / `resources_export.xlsx`
    pub fn filename(&self) -> String {
        format!("resources_export.{}", self.format.extension())
    }

    /// `resources_export_20240301_142500.csv`, for keeping several exports side by side
    pub fn timestamped_filename(&self) -> String {
        format!(
            "resources_export_{}.{}",
            self.generated_at.format("%Y%m%d_%H%M%S"),
            self.format.extension()
        )
    }
}

/// Client for resource endpoints
#[derive(Clone)]
pub struct ResourceClient {
    api: ApiClient,
}

impl ResourceClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fetch one page of resources for a pre-built query
    pub async fn list(&self, query: &QueryParams) -> ApiResult<ResourcePage> {
        let response = self.api.get(RESOURCES_PATH, query.pairs()).await?;
        decode(extract_data(response)?, "resource listing")
    }

    /// Build the query and fetch one page
    pub async fn list_filtered(
        &self,
        page: PageRequest,
        filters: &FilterSet,
        search: &str,
    ) -> ApiResult<ResourcePage> {
        self.list(&build_query(page, filters, search)).await
    }

    /// Most recently created resources (dashboard widget)
    pub async fn recent(&self, limit: u32) -> ApiResult<Vec<Resource>> {
        let page = self
            .list_filtered(PageRequest { page: 1, limit }, &FilterSet::new(), "")
            .await?;
        Ok(page.resources)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Resource> {
        require_id(id)?;
        let response = self.api.get(&ApiClient::entity_path(RESOURCES_PATH, id), &[]).await?;
        decode(extract_data(response)?, "resource")
    }

    /// Create a resource and return it as stored by the backend
    pub async fn create(&self, fields: &ResourceFields) -> ApiResult<Resource> {
        fields.validate()?;

        let response = self
            .api
            .post(RESOURCES_PATH, Some(&fields.to_payload()))
            .await?;
        let data = response.get("data").cloned().unwrap_or(Value::Null);

        // The backend answers with the new id only; read the record back
        if let Some(id) = data.get("resource_id").and_then(Value::as_str) {
            tracing::debug!("Created resource {}", id);
            return self.get(id).await;
        }
        if data.get("_id").is_some() {
            return decode(data, "resource");
        }

        Err(ApiError::ResponseShape {
            status: 201,
            detail: "create response carries neither a resource nor its id".to_string(),
        })
    }

    /// Update a resource and return it as stored by the backend
    pub async fn update(&self, id: &str, fields: &ResourceFields) -> ApiResult<Resource> {
        require_id(id)?;
        fields.validate()?;

        let path = ApiClient::entity_path(RESOURCES_PATH, id);
        let response = self.api.put(&path, Some(&fields.to_payload())).await?;

        match response.get("data") {
            Some(data) if data.get("_id").is_some() => decode(data.clone(), "resource"),
            _ => self.get(id).await,
        }
    }

    pub async fn remove(&self, id: &str) -> ApiResult<()> {
        require_id(id)?;
        self.api
            .delete(&ApiClient::entity_path(RESOURCES_PATH, id))
            .await?;
        tracing::debug!("Deleted resource {}", id);
        Ok(())
    }

    /// Resource statistics (`/api/resources/stats`), sanitized
    pub async fn stats(&self) -> ApiResult<DashboardStats> {
        let response = self.api.get("/api/resources/stats", &[]).await?;
        Ok(sanitize_stats(&extract_data(response)?))
    }

    /// Dashboard statistics (`/api/dashboard/stats`), sanitized
    pub async fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        let response = self.api.get("/api/dashboard/stats", &[]).await?;
        Ok(sanitize_stats(&extract_data(response)?))
    }

    /// Values for the filter pickers, fetched concurrently.
    ///
    /// A failing list is logged and left empty; only an authentication
    /// failure aborts the whole call.
    pub async fn filter_options(&self) -> ApiResult<FilterOptions> {
        let (locations, departments, parents) = futures::join!(
            self.string_list("/api/locations"),
            self.string_list("/api/departments"),
            self.string_list("/api/parent-departments"),
        );

        let mut options = FilterOptions::default();
        for (result, slot) in [
            (locations, &mut options.locations),
            (departments, &mut options.departments),
            (parents, &mut options.parent_departments),
        ] {
            match result {
                Ok(values) => *slot = values,
                Err(ApiError::Unauthenticated) => return Err(ApiError::Unauthenticated),
                Err(e) => tracing::warn!("Failed to fetch filter options: {}", e),
            }
        }
        Ok(options)
    }

    async fn string_list(&self, path: &str) -> ApiResult<Vec<String>> {
        let response = self.api.get(path, &[]).await?;
        let values = match response.get("data") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(values)
    }

    /// Download an export; failures carry the backend's JSON error message
    pub async fn export_as(&self, format: ExportFormat) -> ApiResult<ExportFile> {
        let response = self.api.get_bytes(&format.endpoint()).await?;
        tracing::info!("Export ({}) received, {} bytes", format, response.bytes.len());

        Ok(ExportFile {
            format,
            bytes: response.bytes,
            content_type: response.content_type,
            generated_at: Utc::now(),
        })
    }
}

fn require_id(id: &str) -> ApiResult<()> {
    if id.trim().is_empty() {
        return Err(ApiError::Validation("Resource id is required".to_string()));
    }
    Ok(())
}
