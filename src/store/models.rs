//! User and account request records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// A pending registration awaiting an administrator decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// User projection with the credential hash stripped. This is the only
/// shape that crosses the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResponse {
    pub name: String,
    pub email: String,
}

impl From<AccountRequest> for RequestResponse {
    fn from(request: AccountRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
        }
    }
}
