use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::check_http_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Draft,
    Published,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Draft => "draft",
            ProcessStatus::Published => "published",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(ProcessStatus::Draft),
            "published" => Ok(ProcessStatus::Published),
            other => Err(Error::Internal(format!("Unknown process status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub rounds: Vec<Round>,
    pub status: ProcessStatus,
    pub admin_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Process {
    pub fn round(&self, round_id: Uuid) -> Result<&Round> {
        self.rounds
            .iter()
            .find(|r| r.id == round_id)
            .ok_or_else(|| Error::NotFound(format!("Round {} not found in process", round_id)))
    }

    pub fn is_published(&self) -> bool {
        self.status == ProcessStatus::Published
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: Uuid,
    pub order: i32,
    pub title: String,
    #[serde(flatten)]
    pub kind: RoundKind,
}

impl Round {
    pub fn round_type(&self) -> RoundType {
        self.kind.round_type()
    }

    pub fn field(&self, field_id: Uuid) -> Result<&Field> {
        self.kind
            .fields()
            .iter()
            .find(|f| f.id == field_id)
            .ok_or_else(|| Error::NotFound(format!("Field {} not found in round", field_id)))
    }
}

/// Round content. Forms carry questions, instructions carry reading material, hybrids both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RoundKind {
    Form {
        fields: Vec<Field>,
    },
    Instruction {
        instructions: String,
        #[serde(default)]
        uploads: Vec<Upload>,
    },
    Hybrid {
        fields: Vec<Field>,
        instructions: String,
        #[serde(default)]
        uploads: Vec<Upload>,
    },
}

impl RoundKind {
    pub fn round_type(&self) -> RoundType {
        match self {
            RoundKind::Form { .. } => RoundType::Form,
            RoundKind::Instruction { .. } => RoundType::Instruction,
            RoundKind::Hybrid { .. } => RoundType::Hybrid,
        }
    }

    pub fn fields(&self) -> &[Field] {
        match self {
            RoundKind::Form { fields } | RoundKind::Hybrid { fields, .. } => fields,
            RoundKind::Instruction { .. } => &[],
        }
    }

    pub fn uploads(&self) -> &[Upload] {
        match self {
            RoundKind::Instruction { uploads, .. } | RoundKind::Hybrid { uploads, .. } => uploads,
            RoundKind::Form { .. } => &[],
        }
    }

    pub fn validate(&self) -> Result<()> {
        let needs_fields = matches!(self, RoundKind::Form { .. } | RoundKind::Hybrid { .. });
        if needs_fields && self.fields().is_empty() {
            return Err(Error::BadRequest(format!(
                "A {} round needs at least one field",
                self.round_type()
            )));
        }
        if let RoundKind::Instruction { instructions, .. } | RoundKind::Hybrid { instructions, .. } = self {
            if instructions.trim().is_empty() {
                return Err(Error::BadRequest(format!(
                    "A {} round needs instruction text",
                    self.round_type()
                )));
            }
        }
        for field in self.fields() {
            if field.question.trim().is_empty() {
                return Err(Error::BadRequest("Field question cannot be empty".to_string()));
            }
        }
        for upload in self.uploads() {
            if upload.name.trim().is_empty() {
                return Err(Error::BadRequest("Upload name cannot be empty".to_string()));
            }
            check_http_url(&upload.url, &format!("Upload \"{}\"", upload.name))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundType {
    Form,
    Instruction,
    Hybrid,
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundType::Form => "form",
            RoundType::Instruction => "instruction",
            RoundType::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: Uuid,
    pub question: String,
    pub response_type: ResponseType,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseType {
    ShortText,
    LongText,
    FileUpload,
    Link,
}

impl ResponseType {
    /// File uploads are answered with the URL the upload service handed back.
    pub fn expects_url(&self) -> bool {
        matches!(self, ResponseType::FileUpload | ResponseType::Link)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub name: String,
    pub url: String,
}
