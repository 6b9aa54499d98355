use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::process::{Process, ResponseType, Upload};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(nested)]
    pub rounds: Vec<RoundPayload>,
}

/// Partial update. `rounds`, when present, replaces the whole round list.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProcessPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(nested)]
    pub rounds: Option<Vec<RoundPayload>>,
}

/// A round as sent by the admin UI. Omit `id` for a new round, keep it to edit one in place.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoundPayload {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(flatten)]
    pub kind: RoundKindPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RoundKindPayload {
    Form {
        fields: Vec<FieldPayload>,
    },
    Instruction {
        instructions: String,
        #[serde(default)]
        uploads: Vec<Upload>,
    },
    Hybrid {
        fields: Vec<FieldPayload>,
        instructions: String,
        #[serde(default)]
        uploads: Vec<Upload>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPayload {
    pub id: Option<Uuid>,
    pub question: String,
    pub response_type: ResponseType,
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessList {
    pub items: Vec<Process>,
    pub total: usize,
}

impl From<Vec<Process>> for ProcessList {
    fn from(items: Vec<Process>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}
