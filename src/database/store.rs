use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::admin::Admin;
use crate::models::application::{Application, ApplicationStatus, ArchivedApplication};
use crate::models::candidate::Candidate;
use crate::models::process::{Process, ProcessStatus};

#[derive(Debug, Clone, Default)]
pub struct ProcessFilter {
    pub admin_id: Option<Uuid>,
    pub status: Option<ProcessStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub candidate_id: Option<Uuid>,
    pub process_id: Option<Uuid>,
    pub statuses: Option<Vec<ApplicationStatus>>,
}

impl ApplicationFilter {
    pub fn for_candidate(candidate_id: Uuid) -> Self {
        Self {
            candidate_id: Some(candidate_id),
            ..Self::default()
        }
    }

    pub fn for_process(process_id: Uuid) -> Self {
        Self {
            process_id: Some(process_id),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[ApplicationStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    pub fn matches(&self, app: &Application) -> bool {
        self.candidate_id.map_or(true, |id| app.candidate_id == id)
            && self.process_id.map_or(true, |id| app.process_id == id)
            && self
                .statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&app.status))
    }
}

/// Document storage for accounts, processes and applications.
///
/// Applications are written with a version check: `update_application` only
/// succeeds when the stored version still equals `expected_version`, and
/// returns the bumped version. A mismatch is reported as `Error::Conflict`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_admin(&self, admin: &Admin) -> Result<()>;
    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>>;

    /// Fails with `Error::Conflict` when the email is taken.
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()>;
    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>>;
    async fn get_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>>;
    /// Writes the block fields only.
    async fn update_candidate_block(&self, candidate: &Candidate) -> Result<()>;

    async fn insert_process(&self, process: &Process) -> Result<()>;
    async fn get_process(&self, id: Uuid) -> Result<Option<Process>>;
    async fn list_processes(&self, filter: ProcessFilter) -> Result<Vec<Process>>;
    async fn update_process(&self, process: &Process) -> Result<()>;
    async fn delete_process(&self, id: Uuid) -> Result<()>;

    /// Fails with `Error::DuplicateApplication` when the candidate already applied.
    async fn insert_application(&self, application: &Application) -> Result<()>;
    async fn get_application(&self, id: Uuid) -> Result<Option<Application>>;
    async fn find_application(&self, candidate_id: Uuid, process_id: Uuid) -> Result<Option<Application>>;
    async fn list_applications(&self, filter: ApplicationFilter) -> Result<Vec<Application>>;
    async fn update_application(&self, application: &Application, expected_version: i64) -> Result<i64>;
    /// Copies the application into the archive, then removes the live record.
    async fn archive_application(&self, archived: &ArchivedApplication) -> Result<()>;
    async fn get_archived_application(&self, id: Uuid) -> Result<Option<ArchivedApplication>>;
}
