use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::auth_dto::{LoginRequest, RegisterCandidateRequest, TokenResponse},
    error::Result,
    utils::token::Role,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/candidates/register",
    responses(
        (status = 201, description = "Candidate registered"),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register_candidate(
    State(state): State<AppState>,
    Json(payload): Json<RegisterCandidateRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state
        .account_service
        .register_candidate(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[utoipa::path(
    post,
    path = "/api/auth/candidates/login",
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account blocked")
    )
)]
#[axum::debug_handler]
pub async fn login_candidate(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (candidate, token) = state
        .account_service
        .login_candidate(&payload.email, &payload.password)
        .await?;
    Ok(Json(TokenResponse::bearer(
        token,
        state.account_service.token_ttl_hours(),
        Role::Candidate,
        candidate.id,
        candidate.name,
        candidate.email,
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/admins/login",
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login_admin(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (admin, token) = state
        .account_service
        .login_admin(&payload.email, &payload.password)
        .await?;
    Ok(Json(TokenResponse::bearer(
        token,
        state.account_service.token_ttl_hours(),
        Role::Admin,
        admin.id,
        admin.name,
        admin.email,
    )))
}
