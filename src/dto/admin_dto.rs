use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::application::ExpiredTimeline;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BlockCandidateRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    /// Range-checked by the blocking engine (1..=720).
    pub duration_hours: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredTimelineList {
    pub items: Vec<ExpiredTimeline>,
    pub total: usize,
}

impl From<Vec<ExpiredTimeline>> for ExpiredTimelineList {
    fn from(items: Vec<ExpiredTimeline>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}
