//! Admin operations through the public client.

use httpmock::prelude::*;
use pagecraft_backend::BackendError;
use pagecraft_core::{Role, UserId};
use pagecraft_integration_tests::TestBackend;
use serde_json::json;

#[tokio::test]
async fn test_non_admin_cannot_list_or_change_roles() {
    let ctx = TestBackend::start();
    ctx.sign_in_as("u7").await;
    ctx.profile_role("u7", "user");

    let users = ctx.backend.admin().get_users().await;
    assert!(users.data_ref().is_none());
    assert!(matches!(users.error_ref(), Some(BackendError::NotAuthorized)));

    let update = ctx
        .backend
        .admin()
        .update_user_role(&UserId::from("u8"), &Role::admin())
        .await;
    assert!(update.data_ref().is_none());
    assert!(matches!(update.error_ref(), Some(BackendError::NotAuthorized)));
}

#[tokio::test]
async fn test_admin_writes_unrecognized_role_through() {
    let ctx = TestBackend::start();
    ctx.sign_in_as("boss").await;
    ctx.profile_role("boss", "admin");

    let patch = ctx.server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/profiles")
            .query_param("id", "eq.u123")
            .header("authorization", "Bearer token-boss")
            .json_body(json!({"role": "editor"}));
        then.status(200).json_body(json!([{
            "id": "u123",
            "email": "u123@example.com",
            "role": "editor",
            "created_at": "2025-01-05T00:00:00+00:00"
        }]));
    });

    let outcome = ctx
        .backend
        .admin()
        .update_user_role(&UserId::from("u123"), &Role::from("editor"))
        .await;

    patch.assert();
    assert!(outcome.error_ref().is_none());
    let profiles = outcome.into_data().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].role, Role::from("editor"));
}

#[tokio::test]
async fn test_admin_lists_profiles_newest_first() {
    let ctx = TestBackend::start();
    ctx.sign_in_as("boss").await;
    ctx.profile_role("boss", "admin");

    let _list = ctx.server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/profiles")
            .query_param("select", "*")
            .query_param("order", "created_at.desc");
        then.status(200).json_body(json!([
            {"id": "new", "email": "new@example.com", "role": "user", "created_at": "2025-04-01T00:00:00+00:00"},
            {"id": "boss", "email": "boss@example.com", "role": "admin", "created_at": "2024-01-01T00:00:00+00:00"}
        ]));
    });

    let profiles = ctx
        .backend
        .admin()
        .get_users()
        .await
        .into_data()
        .unwrap();

    assert_eq!(profiles.len(), 2);
    assert!(profiles[0].created_at >= profiles[1].created_at);
    assert!(profiles[1].role.is_admin());
}
