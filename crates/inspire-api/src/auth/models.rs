//! Request and response bodies for the auth and account endpoints

use chrono::{DateTime, Utc};
use inspire_core::{Account, AccountId, ProfileUpdate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OAuth2 password-grant form. `username` carries the email.
///
/// Other grant fields (`grant_type`, `scope`, `client_id`) are accepted and
/// ignored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Issued access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Account registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub username: String,
}

/// Partial update of the caller's own account
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    /// New password; subject to the same strength rules as registration
    pub password: Option<String>,
}

impl UpdateAccountRequest {
    /// Profile fields of this request, without the password
    pub fn profile(&self) -> ProfileUpdate {
        ProfileUpdate {
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountPublic {
    pub id: AccountId,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub user_group: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountPublic {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            firstname: account.firstname,
            lastname: account.lastname,
            username: account.username,
            user_group: account.user_group,
            is_active: account.is_active,
            created_at: account.created_at,
        }
    }
}

/// Acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
