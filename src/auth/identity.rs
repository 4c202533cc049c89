//! The identity of the signed in user.

use axum::{Extension, Json};
use serde::Serialize;

use crate::auth::token::Claims;

/// The signed in user, as verified from their session token.
///
/// The auth guards insert this into the request extensions, so handlers behind a guard can take
/// `Extension(identity): Extension<Identity>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    /// The identity provider's ID for the user, sent to clients as `id`.
    #[serde(rename = "id")]
    pub user_id: String,
    /// The user's primary email address.
    pub email: String,
    /// The user's display name, see [Identity::display_name].
    pub name: Option<String>,
}

impl Identity {
    /// The user's name, or their email if the identity provider has no name for them.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// A route handler that responds with the signed in user's identity.
pub async fn get_current_identity(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

#[cfg(test)]
mod tests {
    use axum::Extension;

    use crate::auth::{Identity, identity::get_current_identity};

    fn identity(name: Option<&str>) -> Identity {
        Identity {
            user_id: "user_1".to_owned(),
            email: "jo@example.com".to_owned(),
            name: name.map(str::to_owned),
        }
    }

    #[test]
    fn display_name_falls_back_to_email() {
        assert_eq!(identity(Some("Jo")).display_name(), "Jo");
        assert_eq!(identity(None).display_name(), "jo@example.com");
        assert_eq!(identity(Some("  ")).display_name(), "jo@example.com");
    }

    #[tokio::test]
    async fn current_identity_is_serialized_with_id() {
        let response = get_current_identity(Extension(identity(Some("Jo")))).await;

        let json = serde_json::to_value(&response.0).unwrap();
        assert_eq!(json["id"], "user_1");
        assert_eq!(json["email"], "jo@example.com");
        assert_eq!(json["name"], "Jo");
    }
}
