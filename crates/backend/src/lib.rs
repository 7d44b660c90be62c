//! Pagecraft Backend - client for the hosted Supabase backend.
//!
//! Three operation groups share one [`Gateway`]:
//! - [`AuthApi`] - sign-up, sign-in, sign-out, session and user lookup, password reset
//! - [`ContentApi`] - save, load and history of HTML pages
//! - [`AdminApi`] - profile listing and role changes, admin only
//!
//! Every operation returns an [`Outcome`] (`{data, error}`) and never an
//! `Err`: failures are logged through `tracing` and reported in `error`.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> Result<(), pagecraft_backend::BackendError> {
//! use pagecraft_backend::Backend;
//!
//! let backend = Backend::from_env()?;
//! let page = backend.content().load_page_content("home").await;
//! if let Some(page) = page.data_ref() {
//!     println!("{}", page.content_html);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod outcome;
mod rest;
pub mod session;
pub mod telemetry;

pub use admin::AdminApi;
pub use auth::{AuthApi, SignUp};
pub use config::{BackendConfig, ConfigError, SessionPolicy};
pub use content::ContentApi;
pub use error::BackendError;
pub use gateway::Gateway;
pub use outcome::Outcome;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};

/// All three operation groups over one gateway.
#[derive(Debug, Clone)]
pub struct Backend {
    gateway: Gateway,
}

impl Backend {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Build from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Config` if the endpoint or key is missing;
    /// callers should abort startup.
    pub fn from_env() -> Result<Self, BackendError> {
        Gateway::from_env().map(Self::new)
    }

    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.gateway.clone())
    }

    #[must_use]
    pub fn content(&self) -> ContentApi {
        ContentApi::new(self.gateway.clone())
    }

    #[must_use]
    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.gateway.clone())
    }
}
