//! Authentication operations.
//!
//! Each call maps to one endpoint of the authentication service and returns
//! an [`Outcome`]. Successful sign-in and sign-up install the session on the
//! shared [`Gateway`], so later content and admin calls run as that user.

use pagecraft_core::{Email, User};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::BackendError;
use crate::gateway::Gateway;
use crate::outcome::Outcome;
use crate::session::{Session, TokenResponse};

/// Path of the reset-password page under the site origin.
const RESET_PASSWORD_PATH: &str = "reset-password";

/// Result of a sign-up.
///
/// `session` is `None` when the platform requires email confirmation first.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: User,
    pub session: Option<Session>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a serde_json::Map<String, serde_json::Value>,
}

/// Authentication group.
#[derive(Debug, Clone)]
pub struct AuthApi {
    gateway: Gateway,
}

impl AuthApi {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Register a new principal with optional metadata.
    #[instrument(skip(self, password, metadata), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Outcome<SignUp> {
        let result = self
            .try_sign_up(email, password, metadata.unwrap_or_default())
            .await;
        Outcome::capture("sign_up", result.map(Some))
    }

    async fn try_sign_up(
        &self,
        email: &str,
        password: &SecretString,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<SignUp, BackendError> {
        let email = Email::parse(email)?;
        let url = self.gateway.auth_url("signup")?;

        let request = self
            .gateway
            .request(Method::POST, url, &self.gateway.anon_bearer())
            .json(&SignUpRequest {
                email: email.as_str(),
                password: password.expose_secret(),
                data: &metadata,
            });

        let body: serde_json::Value = self.gateway.send_json(request).await?;

        // Auto-confirmed projects answer with a session, others with the bare user.
        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(body)?.into_session();
            info!(user_id = %session.user.id, "Signed up with immediate session");
            self.gateway.set_session(session.clone()).await;
            Ok(SignUp {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user: User = serde_json::from_value(body)?;
            info!(user_id = %user.id, "Signed up, confirmation pending");
            Ok(SignUp {
                user,
                session: None,
            })
        }
    }

    /// Exchange credentials for a session.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Outcome<Session> {
        Outcome::capture("sign_in", self.try_sign_in(email, password).await.map(Some))
    }

    async fn try_sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, BackendError> {
        let email = Email::parse(email)?;
        let mut url = self.gateway.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let request = self
            .gateway
            .request(Method::POST, url, &self.gateway.anon_bearer())
            .json(&Credentials {
                email: email.as_str(),
                password: password.expose_secret(),
            });

        let response: TokenResponse = self.gateway.send_json(request).await?;
        let session = response.into_session();
        info!(user_id = %session.user.id, "Signed in");
        self.gateway.set_session(session.clone()).await;
        Ok(session)
    }

    /// End the session.
    ///
    /// The local session is cleared even when the remote call fails; the
    /// failure is still reported, except 401/403/404, which mean the token is
    /// already revoked.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Outcome<()> {
        Outcome::capture("sign_out", self.try_sign_out().await.map(Some))
    }

    async fn try_sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.gateway.stored_session().await else {
            return Ok(());
        };

        let remote = match self.gateway.auth_url("logout") {
            Ok(url) => {
                let request = self.gateway.request(Method::POST, url, &session.bearer());
                self.gateway.send_empty(request).await
            }
            Err(e) => Err(e),
        };
        self.gateway.clear_session().await;

        match remote {
            // The token is already invalid remotely; nothing left to revoke.
            Err(e) if matches!(e.status(), Some(401 | 403 | 404)) => {
                debug!(error = %e, "Session already revoked");
                Ok(())
            }
            other => {
                info!(user_id = %session.user.id, "Signed out");
                other
            }
        }
    }

    /// Current session; `{null, null}` when signed out.
    #[instrument(skip(self))]
    pub async fn get_session(&self) -> Outcome<Session> {
        Outcome::capture("get_session", Ok(self.gateway.current_session().await))
    }

    /// Current principal; `{null, null}` when signed out.
    #[instrument(skip(self))]
    pub async fn get_user(&self) -> Outcome<User> {
        Outcome::capture("get_user", self.try_get_user().await)
    }

    async fn try_get_user(&self) -> Result<Option<User>, BackendError> {
        let Some(session) = self.gateway.current_session().await else {
            return Ok(None);
        };
        self.gateway.fetch_user(&session.bearer()).await.map(Some)
    }

    /// Send a password reset email pointing at `<site url>/reset-password`.
    ///
    /// Fails with `MissingRedirectOrigin` when no site URL is configured.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn reset_password(&self, email: &str) -> Outcome<()> {
        let result = match self.gateway.config().site_url.as_ref() {
            Some(site_url) => match site_url.join(RESET_PASSWORD_PATH) {
                Ok(redirect) => self.try_reset_password(email, &redirect).await,
                Err(e) => Err(e.into()),
            },
            None => Err(BackendError::MissingRedirectOrigin),
        };
        Outcome::capture("reset_password", result.map(Some))
    }

    /// Send a password reset email with an explicit redirect target.
    #[instrument(skip(self, redirect_to), fields(email = %email))]
    pub async fn reset_password_with_redirect(&self, email: &str, redirect_to: &Url) -> Outcome<()> {
        let result = self.try_reset_password(email, redirect_to).await;
        Outcome::capture("reset_password", result.map(Some))
    }

    async fn try_reset_password(&self, email: &str, redirect_to: &Url) -> Result<(), BackendError> {
        let email = Email::parse(email)?;
        let mut url = self.gateway.auth_url("recover")?;
        url.query_pairs_mut()
            .append_pair("redirect_to", redirect_to.as_str());

        let request = self
            .gateway
            .request(Method::POST, url, &self.gateway.anon_bearer())
            .json(&serde_json::json!({ "email": email.as_str() }));

        self.gateway.send_empty(request).await?;
        info!(redirect_to = %redirect_to, "Password reset requested");
        Ok(())
    }

    /// Install the session embedded in a redirect URL.
    ///
    /// `{null, null}` when the URL has no tokens or detection is disabled.
    #[instrument(skip(self, url))]
    pub async fn session_from_url(&self, url: &Url) -> Outcome<Session> {
        Outcome::capture("session_from_url", self.gateway.session_from_url(url).await)
    }
}
