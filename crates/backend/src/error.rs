//! Errors raised while talking to the hosted backend.

use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;

/// `PostgREST` code for a single-object request that matched no rows.
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Errors that can occur during a backend operation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with an error status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Platform error code (`PGRST116`, `invalid_credentials`, ...).
        code: Option<String>,
        /// Human-readable message from the platform.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// No authenticated principal.
    #[error("Usuario no autenticado")]
    NotAuthenticated,

    /// Authenticated principal lacks the admin role.
    #[error("No autorizado")]
    NotAuthorized,

    /// Email rejected before reaching the platform.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] pagecraft_core::EmailError),

    /// Password reset requested with no site origin to redirect to.
    #[error("no redirect origin configured for password reset")]
    MissingRedirectOrigin,

    /// A URL could not be built or parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A write or lookup that must return a row returned none.
    #[error("no row returned from {0}")]
    MissingRow(String),

    /// Reading or writing the persisted session failed.
    #[error("session store error: {0}")]
    SessionStore(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl BackendError {
    /// Whether this is the "no rows" answer to a single-object fetch.
    #[must_use]
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::Api { code: Some(code), .. } if code == NO_ROWS_CODE)
    }

    /// HTTP status of a platform-reported error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build an API error from a non-success response body.
    ///
    /// Understands both the authentication service shape
    /// (`{"error_code", "msg"}` / `{"error", "error_description"}`) and the
    /// REST shape (`{"code", "message", "details", "hint"}`).
    pub(crate) fn from_response_body(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();

        let Some(parsed) = parsed else {
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            };
            return Self::Api {
                status: status.as_u16(),
                code: None,
                message,
            };
        };

        let code = parsed
            .error_code
            .clone()
            .or_else(|| match &parsed.code {
                Some(serde_json::Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| parsed.error.clone());

        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        Self::Api {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

/// Union of the error payloads the platform sends.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}
