//! Integration tests for the Pagecraft backend client.
//!
//! Every test runs the public [`Backend`] API against an `httpmock` server
//! standing in for the hosted platform, so no credentials or network access
//! are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pagecraft-integration-tests
//! ```

use httpmock::prelude::*;
use pagecraft_backend::{Backend, BackendConfig, Gateway};
use secrecy::SecretString;
use serde_json::{Value, json};

/// Public key configured for every test backend.
pub const ANON_KEY: &str = "integration-anon-key";

/// Password accepted by [`TestBackend::sign_in_as`].
pub const PASSWORD: &str = "correct horse battery staple";

/// A backend client wired to a mock platform.
pub struct TestBackend {
    pub server: MockServer,
    pub backend: Backend,
}

impl TestBackend {
    /// Start a mock platform and a client pointing at it.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn start() -> Self {
        let server = MockServer::start();
        let config = BackendConfig::new(&server.base_url(), ANON_KEY).unwrap();
        let backend = Backend::new(Gateway::new(config).unwrap());
        Self { server, backend }
    }

    /// Sign in as `user_id`, registering the token and user endpoints.
    ///
    /// The access token is `token-<user_id>`.
    ///
    /// # Panics
    ///
    /// Panics if the sign-in outcome carries an error.
    pub async fn sign_in_as(&self, user_id: &str) {
        let token = format!("token-{user_id}");
        let email = format!("{user_id}@example.com");
        let user = json!({"id": user_id, "email": email});

        let sign_in_body = json!({
            "access_token": token,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": format!("{token}-refresh"),
            "user": user.clone()
        });
        self.server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password");
            then.status(200).json_body(sign_in_body);
        });

        let bearer = format!("Bearer {token}");
        self.server.mock(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("authorization", bearer);
            then.status(200).json_body(user);
        });

        let outcome = self
            .backend
            .auth()
            .sign_in(&email, &SecretString::from(PASSWORD))
            .await;
        assert!(outcome.is_ok(), "sign in failed: {:?}", outcome.error_ref());
    }

    /// Answer the caller's own role lookup with `role`.
    pub fn profile_role(&self, user_id: &str, role: &str) {
        let filter = format!("eq.{user_id}");
        let body = json!({"role": role});
        self.server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/profiles")
                .query_param("select", "role")
                .query_param("id", filter);
            then.status(200).json_body(body);
        });
    }
}

/// A `paginas` row as the platform returns it.
#[must_use]
pub fn page_row(name: &str, content: &str, user_id: &str, updated_at: &str) -> Value {
    json!({
        "nombre": name,
        "contenido_html": content,
        "usuario_id": user_id,
        "actualizado_en": updated_at
    })
}

/// The platform's answer to a single-object fetch that matched nothing.
#[must_use]
pub fn no_rows_body() -> Value {
    json!({
        "code": "PGRST116",
        "details": "The result contains 0 rows",
        "hint": null,
        "message": "JSON object requested, multiple (or no) rows returned"
    })
}
