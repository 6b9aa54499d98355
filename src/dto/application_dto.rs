use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::application::{Advance, Answer, Application, SubmittedFile};
use crate::utils::timeline::TimeRemaining;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub application_id: Uuid,
    pub application: Application,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordAnswerRequest {
    pub field_id: Uuid,
    #[validate(length(max = 20000))]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRoundRequest {
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub submission: Vec<SubmittedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRoundResponse {
    #[serde(flatten)]
    pub advance: Advance,
    pub application: Application,
}

/// Either an absolute deadline ("22 Nov 2025, 8:53 pm") or a number of hours from now.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "exactly_one_deadline"))]
pub struct SetTimelineRequest {
    #[validate(length(min = 1, max = 64))]
    pub deadline: Option<String>,
    #[validate(range(min = 1, max = 720))]
    pub hours_from_now: Option<i64>,
}

fn exactly_one_deadline(req: &SetTimelineRequest) -> Result<(), ValidationError> {
    match (&req.deadline, req.hours_from_now) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(ValidationError::new("exactly_one_deadline")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub round_id: Uuid,
    pub timeline: Option<String>,
    pub timeline_date: Option<DateTime<Utc>>,
    pub remaining: TimeRemaining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationList {
    pub items: Vec<Application>,
    pub total: usize,
}

impl From<Vec<Application>> for ApplicationList {
    fn from(items: Vec<Application>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}
