use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{
        ApplicationList, RecordAnswerRequest, SetTimelineRequest, SubmitRoundRequest,
        SubmitRoundResponse, TimelineResponse,
    },
    error::{Error, Result},
    models::application::RoundProgress,
    utils::{
        timeline::{format_timeline, get_time_remaining},
        token::Claims,
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/applications",
    responses(
        (status = 200, description = "Applications of the signed-in candidate")
    )
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidate_id = claims.subject_id()?;
    let applications = state.progression_service.list_for_candidate(candidate_id).await?;
    Ok(Json(ApplicationList::from(applications)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application with round progress"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate_id = claims.subject_id()?;
    let application = state.progression_service.get_for_candidate(candidate_id, id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/rounds/{round_id}/answers",
    params(
        ("id" = Uuid, Path, description = "Application ID"),
        ("round_id" = Uuid, Path, description = "Round ID")
    ),
    responses(
        (status = 200, description = "Answer saved"),
        (status = 404, description = "Application, round or field not found"),
        (status = 409, description = "Round already submitted")
    )
)]
#[axum::debug_handler]
pub async fn record_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate_id = claims.subject_id()?;
    let application = state
        .progression_service
        .record_answer(candidate_id, id, round_id, payload.field_id, payload.answer)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/rounds/{round_id}/submit",
    params(
        ("id" = Uuid, Path, description = "Application ID"),
        ("round_id" = Uuid, Path, description = "Round ID")
    ),
    responses(
        (status = 200, description = "Round submitted"),
        (status = 409, description = "Round already submitted or concurrent change"),
        (status = 422, description = "Required field left blank")
    )
)]
#[axum::debug_handler]
pub async fn submit_round(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmitRoundRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate_id = claims.subject_id()?;
    let (application, advance) = state
        .progression_service
        .submit_round(candidate_id, id, round_id, payload.answers, payload.submission)
        .await?;
    Ok(Json(SubmitRoundResponse {
        advance,
        application,
    }))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/rounds/{round_id}/timeline",
    params(
        ("id" = Uuid, Path, description = "Application ID"),
        ("round_id" = Uuid, Path, description = "Round ID")
    ),
    responses(
        (status = 200, description = "Timeline recorded"),
        (status = 400, description = "Unrecognised or past deadline"),
        (status = 409, description = "Timeline already set")
    )
)]
#[axum::debug_handler]
pub async fn set_timeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SetTimelineRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate_id = claims.subject_id()?;
    let deadline = match (payload.deadline, payload.hours_from_now) {
        (Some(text), _) => text,
        (None, Some(hours)) => format_timeline(Utc::now() + Duration::hours(hours)),
        (None, None) => {
            return Err(Error::BadRequest(
                "Either deadline or hoursFromNow is required".to_string(),
            ))
        }
    };

    let application = state
        .progression_service
        .set_timeline(candidate_id, id, round_id, &deadline)
        .await?;
    let progress = application.progress(round_id)?;
    Ok(Json(timeline_response(progress)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/rounds/{round_id}/timeline",
    params(
        ("id" = Uuid, Path, description = "Application ID"),
        ("round_id" = Uuid, Path, description = "Round ID")
    ),
    responses(
        (status = 200, description = "Timeline and time remaining"),
        (status = 404, description = "Application or round not found")
    )
)]
#[axum::debug_handler]
pub async fn get_timeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let candidate_id = claims.subject_id()?;
    let progress = state
        .progression_service
        .round_progress(candidate_id, id, round_id)
        .await?;
    Ok(Json(timeline_response(&progress)))
}

fn timeline_response(progress: &RoundProgress) -> TimelineResponse {
    TimelineResponse {
        round_id: progress.round_id,
        timeline: progress.timeline.clone(),
        timeline_date: progress.timeline_date,
        remaining: get_time_remaining(progress.timeline.as_deref().unwrap_or_default()),
    }
}
