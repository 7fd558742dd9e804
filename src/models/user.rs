use serde::Serialize;
use uuid::Uuid;

use super::enums::Role;

/// Identity record. `password_hash` never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    #[serde(rename = "userType")]
    pub role: Role,
    pub profile_image: Option<String>,
    pub created_at: String,
}

/// Public projection returned by register/login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: Role,
    pub profile_image: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.role,
            profile_image: user.profile_image.clone(),
        }
    }
}
