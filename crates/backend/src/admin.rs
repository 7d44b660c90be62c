//! Admin user management.
//!
//! Both operations first confirm the caller's profile carries the `admin`
//! role, then act. The check and the action are separate requests; the
//! row-level security policies on `profiles` remain the authoritative guard.

use pagecraft_core::{Profile, Role, User, UserId};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::BackendError;
use crate::gateway::Gateway;
use crate::outcome::Outcome;
use crate::rest::Query;

const PROFILES_TABLE: &str = "profiles";

#[derive(Deserialize)]
struct RoleRow {
    #[serde(default)]
    role: Role,
}

#[derive(Serialize)]
struct RolePatch<'a> {
    role: &'a Role,
}

/// Admin group.
#[derive(Debug, Clone)]
pub struct AdminApi {
    gateway: Gateway,
}

impl AdminApi {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// All profiles, newest first. Admin only.
    #[instrument(skip(self))]
    pub async fn get_users(&self) -> Outcome<Vec<Profile>> {
        Outcome::capture("get_users", self.try_get_users().await.map(Some))
    }

    async fn try_get_users(&self) -> Result<Vec<Profile>, BackendError> {
        self.require_admin().await?;

        let query = Query::table(PROFILES_TABLE)
            .select("*")
            .order_desc("created_at");
        self.gateway.select(&query).await
    }

    /// Set a profile's role. Admin only; the role is not validated.
    #[instrument(skip(self), fields(user_id = %user_id, role = %new_role))]
    pub async fn update_user_role(&self, user_id: &UserId, new_role: &Role) -> Outcome<Vec<Profile>> {
        let result = self.try_update_role(user_id, new_role).await;
        Outcome::capture("update_user_role", result.map(Some))
    }

    async fn try_update_role(
        &self,
        user_id: &UserId,
        new_role: &Role,
    ) -> Result<Vec<Profile>, BackendError> {
        let admin = self.require_admin().await?;

        let query = Query::table(PROFILES_TABLE).eq("id", user_id);
        let updated: Vec<Profile> = self
            .gateway
            .update(&query, &RolePatch { role: new_role })
            .await?;

        info!(
            admin_id = %admin.id,
            rows = updated.len(),
            "Profile role updated"
        );
        Ok(updated)
    }

    /// The current user, if their profile role is `admin`.
    async fn require_admin(&self) -> Result<User, BackendError> {
        let user = self.gateway.require_user().await?;

        let query = Query::table(PROFILES_TABLE)
            .select("role")
            .eq("id", &user.id);

        let role = match self.gateway.select_single::<RoleRow>(&query).await {
            Ok(row) => row.role,
            Err(e) if e.is_no_rows() => {
                warn!(user_id = %user.id, "No profile for authenticated user");
                return Err(BackendError::NotAuthorized);
            }
            Err(e) => return Err(e),
        };

        if !role.is_admin() {
            warn!(user_id = %user.id, role = %role, "Admin operation denied");
            return Err(BackendError::NotAuthorized);
        }
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::gateway::tests::{far_future, test_config, test_session};

    async fn signed_in(server: &MockServer) -> AdminApi {
        let gateway = Gateway::new(test_config(server)).unwrap();
        gateway
            .set_session(test_session("tok", "me", far_future()))
            .await;
        AdminApi::new(gateway)
    }

    fn mock_user(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET).path("/auth/v1/user");
            then.status(200).json_body(json!({"id": "me"}));
        })
    }

    fn mock_own_role<'a>(server: &'a MockServer, role: &str) -> httpmock::Mock<'a> {
        let role = role.to_string();
        server.mock(move |when, then| {
            when.method(GET)
                .path("/rest/v1/profiles")
                .query_param("select", "role")
                .query_param("id", "eq.me");
            then.status(200).json_body(json!({"role": role}));
        })
    }

    #[tokio::test]
    async fn test_get_users_requires_session() {
        let server = MockServer::start();
        let admin = AdminApi::new(Gateway::new(test_config(&server)).unwrap());

        let outcome = admin.get_users().await;
        assert!(matches!(
            outcome.error_ref(),
            Some(BackendError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_get_users_denied_for_non_admin() {
        let server = MockServer::start();
        let _user = mock_user(&server);
        let _role = mock_own_role(&server, "user");

        let outcome = signed_in(&server).await.get_users().await;

        assert!(outcome.data_ref().is_none());
        assert!(matches!(
            outcome.error_ref(),
            Some(BackendError::NotAuthorized)
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_authorized() {
        let server = MockServer::start();
        let _user = mock_user(&server);
        let _role = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/profiles")
                .query_param("select", "role");
            then.status(406).json_body(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned"
            }));
        });

        let outcome = signed_in(&server).await.get_users().await;
        assert!(matches!(
            outcome.error_ref(),
            Some(BackendError::NotAuthorized)
        ));
    }

    #[tokio::test]
    async fn test_null_own_role_is_not_authorized() {
        let server = MockServer::start();
        let _user = mock_user(&server);
        let _role = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/profiles")
                .query_param("select", "role")
                .query_param("id", "eq.me");
            then.status(200).json_body(json!({"role": null}));
        });

        let outcome = signed_in(&server).await.get_users().await;
        assert!(matches!(
            outcome.error_ref(),
            Some(BackendError::NotAuthorized)
        ));
    }

    #[tokio::test]
    async fn test_get_users_tolerates_null_roles() {
        let server = MockServer::start();
        let _user = mock_user(&server);
        let _role = mock_own_role(&server, "admin");
        let _list = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/profiles")
                .query_param("select", "*");
            then.status(200).json_body(json!([
                {"id": "me", "email": "me@example.com", "role": "admin", "created_at": "2025-01-01T00:00:00+00:00"},
                {"id": "c", "email": "c@example.com", "role": null, "created_at": "2024-12-01T00:00:00+00:00"}
            ]));
        });

        let profiles = signed_in(&server)
            .await
            .get_users()
            .await
            .into_data()
            .unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].role, Role::default());
    }

    #[tokio::test]
    async fn test_get_users_as_admin() {
        let server = MockServer::start();
        let _user = mock_user(&server);
        let _role = mock_own_role(&server, "admin");
        let list = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/profiles")
                .query_param("select", "*")
                .query_param("order", "created_at.desc");
            then.status(200).json_body(json!([
                {"id": "b", "email": "b@example.com", "role": "user", "created_at": "2025-02-01T00:00:00+00:00"},
                {"id": "me", "email": "me@example.com", "role": "admin", "created_at": "2025-01-01T00:00:00+00:00"}
            ]));
        });

        let profiles = signed_in(&server)
            .await
            .get_users()
            .await
            .into_data()
            .unwrap();

        list.assert();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].id.as_str(), "b");
    }

    #[tokio::test]
    async fn test_update_role_denied_for_non_admin() {
        let server = MockServer::start();
        let _user = mock_user(&server);
        let _role = mock_own_role(&server, "editor");

        let outcome = signed_in(&server)
            .await
            .update_user_role(&UserId::from("u123"), &Role::admin())
            .await;

        assert!(matches!(
            outcome.error_ref(),
            Some(BackendError::NotAuthorized)
        ));
    }

    #[tokio::test]
    async fn test_update_role_writes_unrecognized_role() {
        let server = MockServer::start();
        let _user = mock_user(&server);
        let _role = mock_own_role(&server, "admin");
        let patch = server.mock(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/profiles")
                .query_param("id", "eq.u123")
                .header("prefer", "return=representation")
                .json_body(json!({"role": "editor"}));
            then.status(200).json_body(json!([
                {"id": "u123", "email": "x@example.com", "role": "editor", "created_at": null}
            ]));
        });

        let updated = signed_in(&server)
            .await
            .update_user_role(&UserId::from("u123"), &Role::from("editor"))
            .await
            .into_data()
            .unwrap();

        patch.assert();
        assert_eq!(updated[0].role.as_str(), "editor");
    }
}
