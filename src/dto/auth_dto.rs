use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::token::Role;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCandidateRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub role: Role,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

impl TokenResponse {
    pub fn bearer(token: String, ttl_hours: i64, role: Role, user_id: Uuid, name: String, email: String) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            expires_in: ttl_hours * 3600,
            role,
            user_id,
            name,
            email,
        }
    }
}
