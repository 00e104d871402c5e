//! Backend API interaction module
//!
//! This module provides the plumbing shared by every feature: the session
//! store, the HTTP client, response classification and the error taxonomy.
//!
//! # Module Structure
//!
//! - [`auth`] - Login, registration, logout and profile
//! - [`client`] - Authenticated client bound to a backend base URL
//! - [`error`] - [`ApiError`] and user-facing formatting
//! - [`http`] - HTTP utilities and content-type-aware body parsing
//! - [`session`] - Persisted session token and user profile
//!
//! # Example
//!
//! ```ignore
//! use campus_assets::api::{ApiClient, SessionStore};
//!
//! async fn example() -> campus_assets::api::ApiResult<()> {
//!     let client = ApiClient::new("http://localhost:5000", SessionStore::load_default())?;
//!     let locations = client.get("/api/locations", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod session;

pub use client::ApiClient;
pub use error::{format_api_error, ApiError, ApiResult};
pub use session::{Session, SessionStore, UserProfile};
