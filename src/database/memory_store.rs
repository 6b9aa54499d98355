use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::store::{ApplicationFilter, ProcessFilter, Store};
use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::application::{Application, ArchivedApplication};
use crate::models::candidate::Candidate;
use crate::models::process::Process;

#[derive(Default)]
struct Tables {
    admins: HashMap<Uuid, Admin>,
    candidates: HashMap<Uuid, Candidate>,
    processes: HashMap<Uuid, Process>,
    applications: HashMap<Uuid, Application>,
    archived: HashMap<Uuid, ArchivedApplication>,
}

/// Process-local store used when no database is configured, and by the tests.
/// Each call takes the lock once, so single-document writes are atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_admin(&self, admin: &Admin) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.admins.values().any(|a| a.email.eq_ignore_ascii_case(&admin.email)) {
            return Err(Error::Conflict(format!("Admin {} already exists", admin.email)));
        }
        tables.admins.insert(admin.id, admin.clone());
        Ok(())
    }

    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .candidates
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&candidate.email))
        {
            return Err(Error::Conflict("Email is already registered".to_string()));
        }
        tables.candidates.insert(candidate.id, candidate.clone());
        Ok(())
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        Ok(self.tables.read().await.candidates.get(&id).cloned())
    }

    async fn get_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables
            .candidates
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_candidate_block(&self, candidate: &Candidate) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .candidates
            .get_mut(&candidate.id)
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate.id)))?;
        stored.is_blocked = candidate.is_blocked;
        stored.blocked_reason = candidate.blocked_reason.clone();
        stored.blocked_at = candidate.blocked_at;
        stored.blocked_until = candidate.blocked_until;
        stored.blocked_by = candidate.blocked_by;
        stored.updated_at = candidate.updated_at;
        Ok(())
    }

    async fn insert_process(&self, process: &Process) -> Result<()> {
        self.tables
            .write()
            .await
            .processes
            .insert(process.id, process.clone());
        Ok(())
    }

    async fn get_process(&self, id: Uuid) -> Result<Option<Process>> {
        Ok(self.tables.read().await.processes.get(&id).cloned())
    }

    async fn list_processes(&self, filter: ProcessFilter) -> Result<Vec<Process>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Process> = tables
            .processes
            .values()
            .filter(|p| filter.admin_id.map_or(true, |id| p.admin_id == id))
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn update_process(&self, process: &Process) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.processes.get_mut(&process.id) {
            Some(stored) => {
                *stored = process.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("Process {} not found", process.id))),
        }
    }

    async fn delete_process(&self, id: Uuid) -> Result<()> {
        self.tables
            .write()
            .await
            .processes
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Process {} not found", id)))
    }

    async fn insert_application(&self, application: &Application) -> Result<()> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.applications.values().any(|a| {
            a.candidate_id == application.candidate_id && a.process_id == application.process_id
        });
        if duplicate {
            return Err(Error::DuplicateApplication);
        }
        tables.applications.insert(application.id, application.clone());
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn find_application(&self, candidate_id: Uuid, process_id: Uuid) -> Result<Option<Application>> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .values()
            .find(|a| a.candidate_id == candidate_id && a.process_id == process_id)
            .cloned())
    }

    async fn list_applications(&self, filter: ApplicationFilter) -> Result<Vec<Application>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    async fn update_application(&self, application: &Application, expected_version: i64) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .applications
            .get_mut(&application.id)
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", application.id)))?;
        if stored.version != expected_version {
            return Err(Error::Conflict(
                "Application was modified concurrently, retry the request".to_string(),
            ));
        }
        let mut next = application.clone();
        next.version = expected_version + 1;
        *stored = next;
        Ok(expected_version + 1)
    }

    async fn archive_application(&self, archived: &ArchivedApplication) -> Result<()> {
        let mut tables = self.tables.write().await;
        let id = archived.application.id;
        if tables.applications.remove(&id).is_none() {
            return Err(Error::NotFound(format!("Application {} not found", id)));
        }
        tables.archived.insert(id, archived.clone());
        Ok(())
    }

    async fn get_archived_application(&self, id: Uuid) -> Result<Option<ArchivedApplication>> {
        Ok(self.tables.read().await.archived.get(&id).cloned())
    }
}
