use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        admin_dto::{BlockCandidateRequest, ExpiredTimelineList},
        application_dto::ApplicationList,
        process_dto::{ProcessList, ProcessPayload, UpdateProcessPayload},
    },
    error::Result,
    utils::token::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/processes",
    responses(
        (status = 200, description = "Processes owned by the admin")
    )
)]
#[axum::debug_handler]
pub async fn list_processes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let admin_id = claims.subject_id()?;
    let processes = state.process_service.list(admin_id).await?;
    Ok(Json(ProcessList::from(processes)))
}

#[utoipa::path(
    post,
    path = "/api/admin/processes",
    responses(
        (status = 201, description = "Draft process created"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_process(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ProcessPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let admin_id = claims.subject_id()?;
    let process = state.process_service.create(admin_id, payload).await?;
    Ok((StatusCode::CREATED, Json(process)))
}

#[utoipa::path(
    get,
    path = "/api/admin/processes/{id}",
    params(
        ("id" = Uuid, Path, description = "Process ID")
    ),
    responses(
        (status = 200, description = "Process"),
        (status = 403, description = "Owned by another admin"),
        (status = 404, description = "Process not found")
    )
)]
#[axum::debug_handler]
pub async fn get_process(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let admin_id = claims.subject_id()?;
    let process = state.process_service.get(admin_id, id).await?;
    Ok(Json(process))
}

#[utoipa::path(
    patch,
    path = "/api/admin/processes/{id}",
    params(
        ("id" = Uuid, Path, description = "Process ID")
    ),
    responses(
        (status = 200, description = "Process updated"),
        (status = 400, description = "Invalid payload or round edit on a published process"),
        (status = 404, description = "Process not found")
    )
)]
#[axum::debug_handler]
pub async fn update_process(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProcessPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let admin_id = claims.subject_id()?;
    let process = state.process_service.update(admin_id, id, payload).await?;
    Ok(Json(process))
}

#[utoipa::path(
    delete,
    path = "/api/admin/processes/{id}",
    params(
        ("id" = Uuid, Path, description = "Process ID")
    ),
    responses(
        (status = 204, description = "Process deleted"),
        (status = 400, description = "Process still has applications"),
        (status = 404, description = "Process not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_process(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let admin_id = claims.subject_id()?;
    state.process_service.delete(admin_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/processes/{id}/publish",
    params(
        ("id" = Uuid, Path, description = "Process ID")
    ),
    responses(
        (status = 200, description = "Process published"),
        (status = 400, description = "Process has no rounds")
    )
)]
#[axum::debug_handler]
pub async fn publish_process(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let admin_id = claims.subject_id()?;
    let process = state.process_service.publish(admin_id, id).await?;
    Ok(Json(process))
}

#[utoipa::path(
    get,
    path = "/api/admin/processes/{id}/applications",
    params(
        ("id" = Uuid, Path, description = "Process ID")
    ),
    responses(
        (status = 200, description = "Applications to the process")
    )
)]
#[axum::debug_handler]
pub async fn list_process_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let admin_id = claims.subject_id()?;
    let applications = state.progression_service.list_for_process(admin_id, id).await?;
    Ok(Json(ApplicationList::from(applications)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application archived and removed"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn archive_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let admin_id = claims.subject_id()?;
    let archived = state.progression_service.archive_application(admin_id, id).await?;
    Ok(Json(archived))
}

#[utoipa::path(
    get,
    path = "/api/admin/timelines/expired",
    responses(
        (status = 200, description = "Open rounds past their timeline")
    )
)]
#[axum::debug_handler]
pub async fn list_expired_timelines(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let expired = state.progression_service.expired_timelines(Utc::now()).await?;
    Ok(Json(ExpiredTimelineList::from(expired)))
}

#[utoipa::path(
    get,
    path = "/api/admin/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate with block state"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.account_service.get_candidate(id).await?;
    Ok(Json(candidate))
}

#[utoipa::path(
    post,
    path = "/api/admin/candidates/{id}/block",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate and open applications blocked"),
        (status = 400, description = "Duration outside 1..=720 hours"),
        (status = 404, description = "Candidate not found"),
        (status = 500, description = "Candidate blocked but some applications were not")
    )
)]
#[axum::debug_handler]
pub async fn block_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlockCandidateRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let admin_id = claims.subject_id()?;
    let outcome = state
        .blocking_service
        .block_candidate(id, &payload.reason, payload.duration_hours, Some(admin_id))
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/admin/candidates/{id}/unblock",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate and blocked applications reopened"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn unblock_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.blocking_service.unblock_candidate(id).await?;
    Ok(Json(outcome))
}
