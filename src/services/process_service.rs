use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::database::store::{ApplicationFilter, ProcessFilter, Store};
use crate::dto::process_dto::{
    FieldPayload, ProcessPayload, RoundKindPayload, RoundPayload, UpdateProcessPayload,
};
use crate::error::{Error, Result};
use crate::models::process::{Field, Process, ProcessStatus, Round, RoundKind};
use crate::services::progression_service::ensure_owner;

#[derive(Clone)]
pub struct ProcessService {
    store: Arc<dyn Store>,
}

impl ProcessService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, admin_id: Uuid, payload: ProcessPayload) -> Result<Process> {
        let now = Utc::now();
        let process = Process {
            id: Uuid::new_v4(),
            title: clean_title(&payload.title)?,
            description: payload.description.trim().to_string(),
            rounds: build_rounds(payload.rounds, &[])?,
            status: ProcessStatus::Draft,
            admin_id,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_process(&process).await?;
        info!(process_id = %process.id, admin_id = %admin_id, rounds = process.rounds.len(), "process created");
        Ok(process)
    }

    pub async fn update(
        &self,
        admin_id: Uuid,
        process_id: Uuid,
        payload: UpdateProcessPayload,
    ) -> Result<Process> {
        let mut process = self.get(admin_id, process_id).await?;

        if let Some(title) = payload.title {
            process.title = clean_title(&title)?;
        }
        if let Some(description) = payload.description {
            process.description = description.trim().to_string();
        }
        if let Some(rounds) = payload.rounds {
            if process.is_published() {
                return Err(Error::BadRequest(
                    "Rounds of a published process cannot be changed".to_string(),
                ));
            }
            process.rounds = build_rounds(rounds, &process.rounds)?;
        }

        process.updated_at = Utc::now();
        self.store.update_process(&process).await?;
        Ok(process)
    }

    pub async fn publish(&self, admin_id: Uuid, process_id: Uuid) -> Result<Process> {
        let mut process = self.get(admin_id, process_id).await?;
        if process.is_published() {
            return Ok(process);
        }
        if process.rounds.is_empty() {
            return Err(Error::BadRequest(
                "A process needs at least one round before it can be published".to_string(),
            ));
        }
        process.status = ProcessStatus::Published;
        process.updated_at = Utc::now();
        self.store.update_process(&process).await?;
        info!(process_id = %process_id, "process published");
        Ok(process)
    }

    pub async fn delete(&self, admin_id: Uuid, process_id: Uuid) -> Result<()> {
        self.get(admin_id, process_id).await?;
        let applications = self
            .store
            .list_applications(ApplicationFilter::for_process(process_id))
            .await?;
        if !applications.is_empty() {
            return Err(Error::BadRequest(format!(
                "Process has {} application(s); archive them before deleting",
                applications.len()
            )));
        }
        self.store.delete_process(process_id).await?;
        info!(process_id = %process_id, "process deleted");
        Ok(())
    }

    pub async fn get(&self, admin_id: Uuid, process_id: Uuid) -> Result<Process> {
        let process = self
            .store
            .get_process(process_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Process {} not found", process_id)))?;
        ensure_owner(&process, admin_id)?;
        Ok(process)
    }

    pub async fn list(&self, admin_id: Uuid) -> Result<Vec<Process>> {
        self.store
            .list_processes(ProcessFilter {
                admin_id: Some(admin_id),
                status: None,
            })
            .await
    }

    pub async fn list_published(&self) -> Result<Vec<Process>> {
        self.store
            .list_processes(ProcessFilter {
                admin_id: None,
                status: Some(ProcessStatus::Published),
            })
            .await
    }

    /// Drafts are invisible to candidates.
    pub async fn get_published(&self, process_id: Uuid) -> Result<Process> {
        match self.store.get_process(process_id).await? {
            Some(process) if process.is_published() => Ok(process),
            _ => Err(Error::NotFound(format!("Process {} not found", process_id))),
        }
    }
}

fn clean_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::BadRequest("Title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

/// Turns submitted rounds into stored ones: ids for new rounds and fields,
/// `order` from position, and a round that keeps its id must keep its type.
pub fn build_rounds(payloads: Vec<RoundPayload>, existing: &[Round]) -> Result<Vec<Round>> {
    let mut seen = HashSet::new();
    payloads
        .into_iter()
        .enumerate()
        .map(|(idx, payload)| {
            let kind = build_kind(payload.kind)?;
            let id = match payload.id {
                Some(id) => {
                    let previous = existing.iter().find(|r| r.id == id).ok_or_else(|| {
                        Error::BadRequest(format!("Round {} does not belong to this process", id))
                    })?;
                    if previous.round_type() != kind.round_type() {
                        return Err(Error::BadRequest(format!(
                            "Round \"{}\" is a {} round and cannot become a {} round",
                            previous.title,
                            previous.round_type(),
                            kind.round_type()
                        )));
                    }
                    id
                }
                None => Uuid::new_v4(),
            };
            if !seen.insert(id) {
                return Err(Error::BadRequest(format!("Round {} appears twice", id)));
            }

            let title = payload.title.trim();
            if title.is_empty() {
                return Err(Error::BadRequest(format!("Round {} needs a title", idx + 1)));
            }
            kind.validate()?;

            Ok(Round {
                id,
                order: idx as i32 + 1,
                title: title.to_string(),
                kind,
            })
        })
        .collect()
}

fn build_kind(payload: RoundKindPayload) -> Result<RoundKind> {
    Ok(match payload {
        RoundKindPayload::Form { fields } => RoundKind::Form {
            fields: build_fields(fields)?,
        },
        RoundKindPayload::Instruction {
            instructions,
            uploads,
        } => RoundKind::Instruction {
            instructions,
            uploads,
        },
        RoundKindPayload::Hybrid {
            fields,
            instructions,
            uploads,
        } => RoundKind::Hybrid {
            fields: build_fields(fields)?,
            instructions,
            uploads,
        },
    })
}

fn build_fields(payloads: Vec<FieldPayload>) -> Result<Vec<Field>> {
    let mut seen = HashSet::new();
    payloads
        .into_iter()
        .map(|payload| {
            let question = payload.question.trim();
            if question.is_empty() {
                return Err(Error::BadRequest("Field question cannot be empty".to_string()));
            }
            let id = payload.id.unwrap_or_else(Uuid::new_v4);
            if !seen.insert(id) {
                return Err(Error::BadRequest(format!("Field {} appears twice", id)));
            }
            Ok(Field {
                id,
                question: question.to_string(),
                response_type: payload.response_type,
                required: payload.required.unwrap_or(true),
            })
        })
        .collect()
}
