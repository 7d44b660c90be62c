//! Configured handle to the hosted backend.
//!
//! The [`Gateway`] owns the HTTP client, the connection settings and the
//! current session. It is cheap to clone and is handed to each operation
//! group explicitly; nothing in this crate reaches for a global client.
//!
//! # Headers
//!
//! Every request carries `apikey`, `X-Client-Info` and an `Authorization`
//! bearer: the session's access token when signed in, the public key
//! otherwise.

use std::sync::Arc;

use pagecraft_core::User;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{BackendConfig, ConfigError};
use crate::error::BackendError;
use crate::rest::{Query, SINGLE_OBJECT};
use crate::session::{
    FileSessionStore, MemorySessionStore, Session, SessionStore, TokenResponse, tokens_from_url,
};

/// Identifying header value sent with every request.
pub const CLIENT_INFO: &str = concat!("pagecraft-backend/", env!("CARGO_PKG_VERSION"));

/// Shared handle to the hosted backend.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    config: BackendConfig,
    /// Current session, mirrored into `store` when persistence is on.
    session: RwLock<Option<Session>>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Build a gateway, persisting the session to `config.session_file` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let store: Arc<dyn SessionStore> = match &config.session_file {
            Some(path) if config.session.persist_session => {
                Arc::new(FileSessionStore::new(path.clone()))
            }
            _ => Arc::new(MemorySessionStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Build a gateway from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Config` if the endpoint or key is missing.
    pub fn from_env() -> Result<Self, BackendError> {
        Self::new(BackendConfig::from_env()?)
    }

    /// Build a gateway with an explicit session store.
    ///
    /// With `persist_session` on, a session found in the store is restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_store(
        config: BackendConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, BackendError> {
        let mut api_key = HeaderValue::from_str(config.anon_key()).map_err(|e| {
            ConfigError::InvalidEnvVar("PAGECRAFT_SUPABASE_ANON_KEY".to_string(), e.to_string())
        })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", api_key);
        headers.insert("X-Client-Info", HeaderValue::from_static(CLIENT_INFO));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let session = if config.session.persist_session {
            store.load().unwrap_or_else(|e| {
                warn!(error = %e, "Could not restore persisted session");
                None
            })
        } else {
            None
        };

        if let Some(session) = &session {
            debug!(user_id = %session.user.id, "Restored persisted session");
        }

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                config,
                session: RwLock::new(session),
                store,
            }),
        })
    }

    /// Connection settings.
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Current session, refreshed first when it is about to expire.
    ///
    /// A failed refresh keeps a still-valid session; an already expired one is
    /// dropped.
    pub async fn current_session(&self) -> Option<Session> {
        let session = self.inner.session.read().await.clone()?;

        if !self.inner.config.session.auto_refresh_token
            || !session.is_expired()
            || !session.can_refresh()
        {
            return Some(session);
        }

        let mut slot = self.inner.session.write().await;

        // Another task may have refreshed or signed out while we waited.
        let stale = match slot.as_ref() {
            Some(current) if current.is_expired() => current.clone(),
            other => return other.cloned(),
        };
        let Some(refresh_token) = stale.refresh_token.as_ref() else {
            return Some(stale);
        };

        match self.refresh(refresh_token).await {
            Ok(fresh) => {
                debug!(user_id = %fresh.user.id, "Session refreshed");
                self.persist(Some(fresh.clone())).await;
                *slot = Some(fresh.clone());
                Some(fresh)
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                if stale.expires_within(0) {
                    self.persist(None).await;
                    *slot = None;
                    None
                } else {
                    Some(stale)
                }
            }
        }
    }

    /// Replace the current session.
    pub(crate) async fn set_session(&self, session: Session) {
        let mut slot = self.inner.session.write().await;
        self.persist(Some(session.clone())).await;
        *slot = Some(session);
    }

    /// Drop the current session locally.
    pub(crate) async fn clear_session(&self) {
        let mut slot = self.inner.session.write().await;
        self.persist(None).await;
        *slot = None;
    }

    /// Current session without refreshing.
    pub(crate) async fn stored_session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    /// Mirror the session into the store; failures are logged, not fatal.
    ///
    /// Callers hold the session write guard so the store and the slot change
    /// together. Store I/O runs on the blocking pool.
    async fn persist(&self, session: Option<Session>) {
        if !self.inner.config.session.persist_session {
            return;
        }

        let store = Arc::clone(&self.inner.store);
        let result = tokio::task::spawn_blocking(move || match session {
            Some(session) => store.save(&session),
            None => store.clear(),
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Could not persist session"),
            Err(e) => warn!(error = %e, "Session persistence task failed"),
        }
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &SecretString) -> Result<Session, BackendError> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let request = self
            .request(Method::POST, url, &self.anon_bearer())
            .json(&serde_json::json!({
                "refresh_token": refresh_token.expose_secret()
            }));

        let response: TokenResponse = self.send_json(request).await?;
        Ok(response.into_session())
    }

    /// Install the session carried by a redirect URL.
    ///
    /// Returns `Ok(None)` when detection is disabled or the URL has no tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL reports an error or the token is rejected.
    #[instrument(skip(self, url))]
    pub(crate) async fn session_from_url(&self, url: &Url) -> Result<Option<Session>, BackendError> {
        if !self.inner.config.session.detect_session_in_url {
            return Ok(None);
        }
        let Some(tokens) = tokens_from_url(url)? else {
            return Ok(None);
        };

        let bearer = format!("Bearer {}", tokens.access_token.expose_secret());
        let user = self.fetch_user(&bearer).await?;

        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_at: tokens.expires_at,
            user,
        };
        debug!(user_id = %session.user.id, "Session detected in URL");
        self.set_session(session.clone()).await;
        Ok(Some(session))
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Fetch the user owning a bearer token.
    pub(crate) async fn fetch_user(&self, bearer: &str) -> Result<User, BackendError> {
        let url = self.auth_url("user")?;
        self.send_json(self.request(Method::GET, url, bearer)).await
    }

    /// The authenticated principal, confirmed by the authentication service.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotAuthenticated` without a session or when the
    /// service rejects the token.
    pub(crate) async fn require_user(&self) -> Result<User, BackendError> {
        let session = self
            .current_session()
            .await
            .ok_or(BackendError::NotAuthenticated)?;

        match self.fetch_user(&session.bearer()).await {
            Ok(user) => Ok(user),
            Err(e) if matches!(e.status(), Some(401 | 403)) => {
                debug!(error = %e, "Session rejected by the authentication service");
                Err(BackendError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    pub(crate) fn auth_url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.config.url.join(&format!("auth/v1/{path}"))?)
    }

    pub(crate) fn anon_bearer(&self) -> String {
        format!("Bearer {}", self.inner.config.anon_key())
    }

    /// Bearer for table access: the session token, or the public key.
    async fn rest_bearer(&self) -> String {
        self.current_session()
            .await
            .map_or_else(|| self.anon_bearer(), |session| session.bearer())
    }

    pub(crate) fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header(AUTHORIZATION, bearer)
    }

    /// Send a request and decode a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` for non-success statuses (with the body's
    /// code and message), `Http` for transport errors, `Parse` for bad JSON.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = Self::send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request, ignoring any success body.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        Self::send(request).await.map(drop)
    }

    async fn send(request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::from_response_body(status, &body));
        }
        Ok(body)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Fetch all rows matching a query.
    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Vec<T>, BackendError> {
        let url = query.url(&self.inner.config.url)?;
        let request = self.request(Method::GET, url, &self.rest_bearer().await);
        self.send_json(request).await
    }

    /// Fetch exactly one row. Zero rows is an `Api` error with code `PGRST116`.
    pub(crate) async fn select_single<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<T, BackendError> {
        let url = query.url(&self.inner.config.url)?;
        let request = self
            .request(Method::GET, url, &self.rest_bearer().await)
            .header(ACCEPT, SINGLE_OBJECT);
        self.send_json(request).await
    }

    /// Insert a row, overwriting the existing one on conflict.
    pub(crate) async fn upsert<B, T>(&self, query: &Query, row: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = query.url(&self.inner.config.url)?;
        let request = self
            .request(Method::POST, url, &self.rest_bearer().await)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(row);
        self.send_json(request).await
    }

    /// Patch all rows matching a query.
    pub(crate) async fn update<B, T>(&self, query: &Query, patch: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = query.url(&self.inner.config.url)?;
        let request = self
            .request(Method::PATCH, url, &self.rest_bearer().await)
            .header("Prefer", "return=representation")
            .json(patch);
        self.send_json(request).await
    }
}
