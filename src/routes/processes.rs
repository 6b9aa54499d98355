use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::{application_dto::ApplyResponse, process_dto::ProcessList},
    error::Result,
    utils::token::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/processes",
    responses(
        (status = 200, description = "Published processes")
    )
)]
#[axum::debug_handler]
pub async fn list_processes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let processes = state.process_service.list_published().await?;
    Ok(Json(ProcessList::from(processes)))
}

#[utoipa::path(
    get,
    path = "/api/processes/{id}",
    params(
        ("id" = Uuid, Path, description = "Process ID")
    ),
    responses(
        (status = 200, description = "Process with its rounds"),
        (status = 404, description = "Process not found or not published")
    )
)]
#[axum::debug_handler]
pub async fn get_process(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let process = state.process_service.get_published(id).await?;
    Ok(Json(process))
}

#[utoipa::path(
    post,
    path = "/api/processes/{id}/apply",
    params(
        ("id" = Uuid, Path, description = "Process ID")
    ),
    responses(
        (status = 201, description = "Application created"),
        (status = 403, description = "Account blocked"),
        (status = 404, description = "Process not found"),
        (status = 409, description = "Already applied")
    )
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate_id = claims.subject_id()?;
    let application = state
        .progression_service
        .initialize_application(candidate_id, id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApplyResponse {
            application_id: application.id,
            application,
        }),
    ))
}
