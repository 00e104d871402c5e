//! Authentication endpoints
//!
//! Login, registration, logout and profile lookup. Successful login stores
//! the session; logout clears it even when the backend call fails.

use super::client::{decode, envelope_message, extract_data, ApiClient};
use super::error::{ApiError, ApiResult};
use super::session::{Session, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// New account details
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

impl Registration {
    fn validate(&self) -> ApiResult<()> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(ApiError::Validation("A valid email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(ApiError::Validation("Password is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Name is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct LoginData {
    session_token: String,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Exchange an identity token for a backend session and store it
pub async fn login(client: &ApiClient, id_token: &str) -> ApiResult<Session> {
    if id_token.trim().is_empty() {
        return Err(ApiError::Validation("Identity token is required".to_string()));
    }

    let response = client
        .post_public("/api/auth/login", &json!({ "idToken": id_token }))
        .await?;
    let data: LoginData = decode(extract_data(response)?, "login response")?;
    if data.session_token.is_empty() {
        return Err(ApiError::ResponseShape {
            status: 200,
            detail: "login response carries an empty session token".to_string(),
        });
    }

    let session = Session {
        token: data.session_token,
        user: data.user,
    };
    client.session.set(session.clone()).await?;

    tracing::info!(
        "Logged in as {}",
        session
            .user
            .as_ref()
            .map(|u| u.display_name())
            .unwrap_or("unknown user")
    );
    Ok(session)
}

/// Create an account; returns the backend's confirmation message
pub async fn register(client: &ApiClient, registration: &Registration) -> ApiResult<String> {
    registration.validate()?;

    let body = serde_json::to_value(registration)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let response = client.post_public("/api/auth/register", &body).await?;

    Ok(envelope_message(&response).unwrap_or_else(|| {
        if registration.role == "admin" {
            "Admin account is pending approval".to_string()
        } else {
            "Registration successful".to_string()
        }
    }))
}

/// End the session on the backend and locally
pub async fn logout(client: &ApiClient) -> ApiResult<()> {
    if client.session.is_authenticated().await {
        if let Err(e) = client.post("/api/auth/logout", None).await {
            tracing::warn!("Backend logout failed, clearing local session anyway: {}", e);
        }
    }
    client.session.clear().await
}

/// Fetch the current user's profile
pub async fn profile(client: &ApiClient) -> ApiResult<UserProfile> {
    let response = client.get("/api/auth/profile", &[]).await?;
    decode(extract_data(response)?, "profile")
}
