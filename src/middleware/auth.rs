use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::utils::token::{verify_token, Role};
use crate::AppState;

pub async fn require_candidate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_role(&state, req, next, Role::Candidate).await
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_role(&state, req, next, Role::Admin).await
}

/// Verifies the bearer token and puts its `Claims` into the request extensions.
async fn require_role(state: &AppState, mut req: Request, next: Next, role: Role) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return reject(StatusCode::UNAUTHORIZED, "missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return reject(StatusCode::UNAUTHORIZED, "bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return reject(StatusCode::UNAUTHORIZED, "unsupported_scheme");
    };

    match verify_token(&state.config.jwt_secret, token.trim()) {
        Ok(claims) if claims.role == role => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Ok(_) => reject(StatusCode::FORBIDDEN, "forbidden"),
        Err(_) => reject(StatusCode::UNAUTHORIZED, "invalid_token"),
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}
