//! Authenticated session and its persistence.
//!
//! A [`Session`] is the token bundle issued by the authentication service.
//! The gateway keeps the current one in memory and mirrors it into a
//! [`SessionStore`] so it survives restarts.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pagecraft_core::User;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Seconds before expiry at which the access token is considered stale.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Token bundle for an authenticated principal.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub token_type: String,
    /// Unix timestamp when the access token expires.
    pub expires_at: i64,
    pub user: User,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user.id)
            .finish()
    }
}

impl Session {
    /// Check if the access token has expired (with a 60 second margin).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(EXPIRY_MARGIN_SECS)
    }

    /// Check if the access token will expire within the given number of seconds.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - seconds
    }

    /// Whether a refresh token is available.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Value for the `Authorization` header.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

/// Token response of `/auth/v1/token` (password and refresh grants).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry, preferred over `expires_in` when present.
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenResponse {
    pub(crate) fn into_session(self) -> Session {
        let now = chrono::Utc::now().timestamp();
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(3600));

        Session {
            access_token: SecretString::from(self.access_token),
            refresh_token: self
                .refresh_token
                .filter(|token| !token.is_empty())
                .map(SecretString::from),
            token_type: self.token_type,
            expires_at,
            user: self.user,
        }
    }
}

/// Tokens carried by a redirect URL (email confirmation, magic link, recovery).
#[derive(Debug)]
pub(crate) struct UrlTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub token_type: String,
    pub expires_at: i64,
}

/// Read session tokens from the fragment (or query) of a redirect URL.
///
/// Returns `Ok(None)` when the URL carries no `access_token`.
///
/// # Errors
///
/// Returns `BackendError::Api` when the URL carries an `error` parameter.
pub(crate) fn tokens_from_url(url: &url::Url) -> Result<Option<UrlTokens>, BackendError> {
    let params = url
        .fragment()
        .filter(|fragment| fragment.contains('='))
        .or_else(|| url.query())
        .unwrap_or_default();

    let mut access_token = None;
    let mut refresh_token = None;
    let mut token_type = None;
    let mut expires_in = None;
    let mut expires_at = None;
    let mut error = None;
    let mut error_code = None;
    let mut error_description = None;

    for (key, value) in url::form_urlencoded::parse(params.as_bytes()) {
        match key.as_ref() {
            "access_token" => access_token = Some(value.into_owned()),
            "refresh_token" => refresh_token = Some(value.into_owned()),
            "token_type" => token_type = Some(value.into_owned()),
            "expires_in" => expires_in = value.parse::<i64>().ok(),
            "expires_at" => expires_at = value.parse::<i64>().ok(),
            "error" => error = Some(value.into_owned()),
            "error_code" => error_code = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(BackendError::Api {
            status: 401,
            code: error_code.or_else(|| Some(error.clone())),
            message: error_description.unwrap_or(error),
        });
    }

    let Some(access_token) = access_token.filter(|token| !token.is_empty()) else {
        return Ok(None);
    };

    let now = chrono::Utc::now().timestamp();
    Ok(Some(UrlTokens {
        access_token: SecretString::from(access_token),
        refresh_token: refresh_token
            .filter(|token| !token.is_empty())
            .map(SecretString::from),
        token_type: token_type.unwrap_or_else(default_token_type),
        expires_at: expires_at.unwrap_or_else(|| now + expires_in.unwrap_or(3600)),
    }))
}

// =============================================================================
// Persistence
// =============================================================================

/// On-disk form of a session. Tokens are stored in clear; protect the file.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: Option<String>,
    token_type: String,
    expires_at: i64,
    user: User,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.expose_secret().to_string(),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
            token_type: session.token_type.clone(),
            expires_at: session.expires_at,
            user: session.user.clone(),
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            access_token: SecretString::from(stored.access_token),
            refresh_token: stored.refresh_token.map(SecretString::from),
            token_type: stored.token_type,
            expires_at: stored.expires_at,
            user: stored.user,
        }
    }
}

/// Where the gateway mirrors the current session.
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored session exists but cannot be read.
    fn load(&self) -> Result<Option<Session>, BackendError>;

    /// Replace the persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    fn save(&self, session: &Session) -> Result<(), BackendError>;

    /// Remove the persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored session cannot be removed.
    fn clear(&self) -> Result<(), BackendError>;
}

/// Process-local store; the session is lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, BackendError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), BackendError> {
        *self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), BackendError> {
        *self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, BackendError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredSession = serde_json::from_str(&contents)?;
        Ok(Some(stored.into()))
    }

    fn save(&self, session: &Session) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string(&StoredSession::from(session))?;

        // Tokens are stored in clear text: owner-only access.
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

        let mut file = options.open(&self.path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), BackendError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
