//! Identity records returned by the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, UserId, timestamp};

/// An authenticated principal as reported by the authentication service.
///
/// Only the fields this crate reads are modelled; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Metadata attached at sign-up.
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_user_ignores_unknown_fields() {
        let user: User = serde_json::from_value(json!({
            "id": "8d0fd2b3-9ca1-4a7e-a1b4-1e5e2c6f6a10",
            "aud": "authenticated",
            "email": "ana@example.com",
            "user_metadata": {"nombre": "Ana"},
            "created_at": "2025-01-10T08:00:00.000000Z"
        }))
        .unwrap();

        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
        assert_eq!(user.user_metadata["nombre"], "Ana");
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_profile_without_role_defaults_to_user() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "u1",
            "email": null,
            "created_at": null
        }))
        .unwrap();

        assert_eq!(profile.role, Role::default());
        assert!(profile.created_at.is_none());
    }

    #[test]
    fn test_profile_with_null_role_defaults_to_user() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "u2",
            "email": "b@example.com",
            "role": null,
            "created_at": "2025-01-01T00:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(profile.role, Role::default());
    }
}
