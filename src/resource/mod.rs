//! Resource layer
//!
//! Everything about the inventory itself: the data model, how listings are
//! queried and paginated, how statistics are normalized, and the client that
//! talks to the resource endpoints.
//!
//! # Architecture
//!
//! - [`model`] - Resource records, form input and cost normalization
//! - [`query`] - Filter sets and canonical query building
//! - [`pagination`] - Page state and page-button windows
//! - [`stats`] - Sanitization of aggregate statistics
//! - [`client`] - CRUD, listing, filter options, stats and export calls
//!
//! # Example
//!
//! ```ignore
//! use campus_assets::resource::{build_query, FilterKey, FilterSet, PageRequest, ResourceClient};
//!
//! async fn physics_lab(client: &ResourceClient) -> campus_assets::api::ApiResult<()> {
//!     let filters = FilterSet::new().with(FilterKey::Department, "Physics");
//!     let page = client.list(&build_query(PageRequest::default(), &filters, "")).await?;
//!     println!("{} resources", page.pagination.total);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod model;
pub mod pagination;
pub mod query;
pub mod stats;

pub use client::{ExportFile, ExportFormat, ResourceClient};
pub use model::{parse_cost, FilterOptions, Pagination, Resource, ResourceFields, ResourcePage};
pub use pagination::{PageWindow, PaginationController};
pub use query::{build_query, FilterKey, FilterSet, PageRequest, QueryParams};
pub use stats::{sanitize_stats, to_finite_number, DashboardStats};
