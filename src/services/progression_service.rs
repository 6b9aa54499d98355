use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::database::store::{ApplicationFilter, Store};
use crate::error::{Error, Result};
use crate::models::application::{
    Advance, Answer, Application, ApplicationStatus, ArchivedApplication, ExpiredTimeline,
    RoundProgress, SubmittedFile,
};
use crate::models::process::Process;

/// Drives an application through its rounds. Every write is load, transition, versioned save.
#[derive(Clone)]
pub struct ProgressionService {
    store: Arc<dyn Store>,
}

impl ProgressionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn initialize_application(
        &self,
        candidate_id: Uuid,
        process_id: Uuid,
    ) -> Result<Application> {
        let now = Utc::now();
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))?;
        if let Some(notice) = candidate.block_notice(now) {
            return Err(Error::AccountBlocked(notice));
        }

        let process = self.published_process(process_id).await?;
        if self
            .store
            .find_application(candidate_id, process_id)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateApplication);
        }

        let application = Application::initialize(candidate_id, &process, now)?;
        self.store.insert_application(&application).await?;
        info!(
            application_id = %application.id,
            candidate_id = %candidate_id,
            process_id = %process_id,
            rounds = application.rounds.len(),
            "application created"
        );
        Ok(application)
    }

    pub async fn record_answer(
        &self,
        candidate_id: Uuid,
        application_id: Uuid,
        round_id: Uuid,
        field_id: Uuid,
        answer: String,
    ) -> Result<Application> {
        let mut application = self.owned_application(candidate_id, application_id).await?;
        let process = self.process(application.process_id).await?;
        let round = process.round(round_id)?;

        application.record_answer(round, field_id, answer, Utc::now())?;
        self.save(&mut application).await?;
        Ok(application)
    }

    pub async fn submit_round(
        &self,
        candidate_id: Uuid,
        application_id: Uuid,
        round_id: Uuid,
        answers: Vec<Answer>,
        files: Vec<SubmittedFile>,
    ) -> Result<(Application, Advance)> {
        let mut application = self.owned_application(candidate_id, application_id).await?;
        let process = self.process(application.process_id).await?;
        let round = process.round(round_id)?;

        let advance = application.submit_round(round, answers, files, Utc::now())?;
        self.save(&mut application).await?;
        match &advance {
            Advance::Next { index, .. } => info!(
                application_id = %application.id,
                round = %round.title,
                next_index = index,
                "round submitted"
            ),
            Advance::Completed => info!(
                application_id = %application.id,
                round = %round.title,
                "final round submitted, application completed"
            ),
        }
        Ok((application, advance))
    }

    pub async fn set_timeline(
        &self,
        candidate_id: Uuid,
        application_id: Uuid,
        round_id: Uuid,
        deadline: &str,
    ) -> Result<Application> {
        let mut application = self.owned_application(candidate_id, application_id).await?;
        let parsed = application.set_timeline(round_id, deadline, Utc::now())?;
        self.save(&mut application).await?;
        info!(
            application_id = %application.id,
            round_id = %round_id,
            deadline = %parsed,
            "timeline set"
        );
        Ok(application)
    }

    pub async fn round_progress(
        &self,
        candidate_id: Uuid,
        application_id: Uuid,
        round_id: Uuid,
    ) -> Result<RoundProgress> {
        let application = self.owned_application(candidate_id, application_id).await?;
        Ok(application.progress(round_id)?.clone())
    }

    pub async fn get_for_candidate(&self, candidate_id: Uuid, application_id: Uuid) -> Result<Application> {
        self.owned_application(candidate_id, application_id).await
    }

    pub async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Application>> {
        self.store
            .list_applications(ApplicationFilter::for_candidate(candidate_id))
            .await
    }

    pub async fn list_for_process(&self, admin_id: Uuid, process_id: Uuid) -> Result<Vec<Application>> {
        let process = self.process(process_id).await?;
        ensure_owner(&process, admin_id)?;
        self.store
            .list_applications(ApplicationFilter::for_process(process_id))
            .await
    }

    /// In-flight applications whose open round ran past its timeline.
    pub async fn expired_timelines(&self, now: DateTime<Utc>) -> Result<Vec<ExpiredTimeline>> {
        let in_flight = self
            .store
            .list_applications(ApplicationFilter::default().with_statuses(&[
                ApplicationStatus::Applied,
                ApplicationStatus::InProgress,
            ]))
            .await?;

        Ok(in_flight
            .iter()
            .filter_map(|app| {
                app.expired_timeline(now).map(|round| ExpiredTimeline {
                    application_id: app.id,
                    candidate_id: app.candidate_id,
                    process_id: app.process_id,
                    round_id: round.round_id,
                    timeline: round.timeline.clone().unwrap_or_default(),
                    timeline_date: round.timeline_date,
                })
            })
            .collect())
    }

    /// Soft delete: the archive copy is written before the live record goes away.
    pub async fn archive_application(
        &self,
        admin_id: Uuid,
        application_id: Uuid,
    ) -> Result<ArchivedApplication> {
        let application = self
            .store
            .get_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", application_id)))?;
        let process = self.process(application.process_id).await?;
        ensure_owner(&process, admin_id)?;

        let archived = ArchivedApplication {
            application,
            archived_at: Utc::now(),
            archived_by: admin_id,
        };
        self.store.archive_application(&archived).await?;
        info!(application_id = %application_id, admin_id = %admin_id, "application archived");
        Ok(archived)
    }

    pub async fn round_title(&self, process_id: Uuid, round_id: Uuid) -> Result<String> {
        let process = self.process(process_id).await?;
        Ok(process.round(round_id)?.title.clone())
    }

    async fn owned_application(&self, candidate_id: Uuid, application_id: Uuid) -> Result<Application> {
        match self.store.get_application(application_id).await? {
            Some(app) if app.candidate_id == candidate_id => Ok(app),
            _ => Err(Error::NotFound(format!("Application {} not found", application_id))),
        }
    }

    async fn process(&self, process_id: Uuid) -> Result<Process> {
        self.store
            .get_process(process_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Process {} not found", process_id)))
    }

    async fn published_process(&self, process_id: Uuid) -> Result<Process> {
        match self.store.get_process(process_id).await? {
            Some(process) if process.is_published() => Ok(process),
            _ => Err(Error::NotFound(format!("Process {} not found", process_id))),
        }
    }

    async fn save(&self, application: &mut Application) -> Result<()> {
        let expected = application.version;
        application.version = self.store.update_application(application, expected).await?;
        Ok(())
    }
}

pub(crate) fn ensure_owner(process: &Process, admin_id: Uuid) -> Result<()> {
    if process.admin_id != admin_id {
        return Err(Error::Forbidden(
            "Process belongs to another admin".to_string(),
        ));
    }
    Ok(())
}
