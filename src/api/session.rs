//! Session Store
//!
//! Holds the bearer token and user profile returned by login. The store is
//! created once, handed to every client by reference, and persisted to the
//! user's config directory so separate CLI invocations share a login.

use super::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Profile of the logged-in user as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Fields we do not interpret but keep for display
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("unknown user")
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Shared, persisted session state
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<RwLock<Option<Session>>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            path: None,
        }
    }

    /// In-memory store seeded with a session
    pub fn with_session(session: Session) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(session))),
            path: None,
        }
    }

    /// Store backed by a file; an existing file seeds the session
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = read_session_file(&path);
        if session.is_some() {
            tracing::debug!("Restored session from {:?}", path);
        }

        Self {
            current: Arc::new(RwLock::new(session)),
            path: Some(path),
        }
    }

    /// Store at the default location, or in-memory when no config dir exists
    pub fn load_default() -> Self {
        match Self::default_path() {
            Some(path) => Self::persistent(path),
            None => {
                tracing::warn!("No config directory available, session will not persist");
                Self::in_memory()
            }
        }
    }

    /// Default session file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("campus-assets").join("session.json"))
    }

    /// Current token, if logged in
    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    /// Current token, or [`ApiError::Unauthenticated`]
    pub async fn require_token(&self) -> ApiResult<String> {
        self.token().await.ok_or(ApiError::Unauthenticated)
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Replace the session (login)
    pub async fn set(&self, session: Session) -> ApiResult<()> {
        if let Some(path) = &self.path {
            write_session_file(path, &session)?;
        }
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Drop the session (logout, or a 401 from the backend)
    pub async fn clear(&self) -> ApiResult<()> {
        *self.current.write().await = None;

        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::debug!("Session cleared");
        Ok(())
    }
}

fn read_session_file(path: &Path) -> Option<Session> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Session>(&content) {
        Ok(session) if !session.token.is_empty() => Some(session),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable session file {:?}: {}", path, e);
            None
        }
    }
}

fn write_session_file(path: &Path, session: &Session) -> ApiResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(session)
        .map_err(|e| ApiError::Io(std::io::Error::other(e)))?;
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    // The token is a bearer credential: owner-only from creation on
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        // A file left by an older run keeps its mode on open; tighten it too
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        file.write_all(content.as_bytes())?;
    }
    #[cfg(not(unix))]
    options.open(path)?.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_session_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("campus-assets-test-{}", uuid::Uuid::new_v4()))
            .join("session.json")
    }

    fn sample_session() -> Session {
        Session {
            token: "tok-123".to_string(),
            user: Some(UserProfile {
                email: Some("ada@campus.edu".to_string()),
                role: Some("admin".to_string()),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_in_memory_lifecycle() {
        let store = SessionStore::in_memory();
        assert!(store.token().await.is_none());
        assert!(matches!(
            store.require_token().await,
            Err(ApiError::Unauthenticated)
        ));

        store.set(sample_session()).await.unwrap();
        assert_eq!(store.token().await.as_deref(), Some("tok-123"));

        store.clear().await.unwrap();
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_persistent_store_survives_reload() {
        let path = temp_session_path();

        let store = SessionStore::persistent(&path);
        assert!(store.current().await.is_none());
        store.set(sample_session()).await.unwrap();

        let reloaded = SessionStore::persistent(&path);
        assert_eq!(reloaded.current().await, Some(sample_session()));

        reloaded.clear().await.unwrap();
        assert!(!path.exists());
        assert!(SessionStore::persistent(&path).current().await.is_none());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_session_file_is_ignored() {
        let path = temp_session_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::persistent(&path);
        assert!(store.token().await.is_none());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_session_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        // Pre-existing world-readable file from an earlier run
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        SessionStore::persistent(&path)
            .set(sample_session())
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_user_profile_accepts_mongo_id() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"_id": "abc", "name": "Ada", "role": "user", "department": "CS"}"#,
        )
        .unwrap();
        assert_eq!(profile.id.as_deref(), Some("abc"));
        assert_eq!(profile.display_name(), "Ada");
        assert!(!profile.is_admin());
        assert_eq!(profile.extra["department"], "CS");
    }
}
