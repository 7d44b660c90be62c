//! Backend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PAGECRAFT_SUPABASE_URL` - Project endpoint (e.g., `https://abc.supabase.co`)
//! - `PAGECRAFT_SUPABASE_ANON_KEY` - Public (anon) API key
//!
//! ## Optional
//! - `PAGECRAFT_SITE_URL` - Public origin of the site, used for password reset links
//! - `PAGECRAFT_AUTO_REFRESH_TOKEN` - Refresh access tokens before they expire (default: true)
//! - `PAGECRAFT_PERSIST_SESSION` - Keep the session across restarts (default: true)
//! - `PAGECRAFT_DETECT_SESSION_IN_URL` - Accept sessions from redirect URLs (default: true)
//! - `PAGECRAFT_SESSION_FILE` - File used to persist the session

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const URL_VAR: &str = "PAGECRAFT_SUPABASE_URL";
const ANON_KEY_VAR: &str = "PAGECRAFT_SUPABASE_ANON_KEY";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the gateway keeps the authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Exchange the refresh token before the access token expires.
    pub auto_refresh_token: bool,
    /// Write the session to the session store and reload it at startup.
    pub persist_session: bool,
    /// Accept session tokens embedded in redirect URLs.
    pub detect_session_in_url: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            detect_session_in_url: true,
        }
    }
}

/// Connection settings for the hosted backend.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project endpoint, always ending in `/`.
    pub url: Url,
    /// Public API key sent as `apikey` on every request.
    pub anon_key: SecretString,
    /// Public origin of the site that hosts the reset-password page.
    pub site_url: Option<Url>,
    pub session: SessionPolicy,
    /// Where to persist the session when `session.persist_session` is on.
    pub session_file: Option<PathBuf>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("site_url", &self.site_url.as_ref().map(Url::as_str))
            .field("session", &self.session)
            .field("session_file", &self.session_file)
            .finish()
    }
}

impl BackendConfig {
    /// Build a configuration from an endpoint and key, with default session policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL or key is malformed.
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let anon_key = anon_key.into();
        validate_api_key(&anon_key, ANON_KEY_VAR)?;

        Ok(Self {
            url: parse_base_url(url, URL_VAR)?,
            anon_key: SecretString::from(anon_key),
            site_url: None,
            session: SessionPolicy::default(),
            session_file: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or any variable
    /// is invalid. Callers are expected to abort startup on this error.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BackendConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get_optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_required = |key: &str| {
            get_optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let url = get_required(URL_VAR)?;
        let anon_key = get_required(ANON_KEY_VAR)?;
        let mut config = Self::new(&url, anon_key)?;

        config.site_url = get_optional("PAGECRAFT_SITE_URL")
            .map(|value| {
                Url::parse(&value).map_err(|e| {
                    ConfigError::InvalidEnvVar("PAGECRAFT_SITE_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        config.session = SessionPolicy {
            auto_refresh_token: get_bool(&lookup, "PAGECRAFT_AUTO_REFRESH_TOKEN", true)?,
            persist_session: get_bool(&lookup, "PAGECRAFT_PERSIST_SESSION", true)?,
            detect_session_in_url: get_bool(&lookup, "PAGECRAFT_DETECT_SESSION_IN_URL", true)?,
        };
        config.session_file = get_optional("PAGECRAFT_SESSION_FILE").map(PathBuf::from);

        Ok(config)
    }

    /// Set the public site origin.
    #[must_use]
    pub fn with_site_url(mut self, site_url: Url) -> Self {
        self.site_url = Some(site_url);
        self
    }

    /// Replace the session policy.
    #[must_use]
    pub const fn with_session_policy(mut self, session: SessionPolicy) -> Self {
        self.session = session;
        self
    }

    /// Persist the session to a file.
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    pub(crate) fn anon_key(&self) -> &str {
        self.anon_key.expose_secret()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the project URL, normalized to end in `/` so relative joins keep the path.
fn parse_base_url(value: &str, var_name: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// The key is sent in a header, so it must be a single printable token.
fn validate_api_key(value: &str, var_name: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::MissingEnvVar(var_name.to_string()));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

fn get_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
