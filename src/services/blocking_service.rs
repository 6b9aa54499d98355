use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::store::{ApplicationFilter, Store};
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::candidate::{BlockState, Candidate};

pub const MIN_BLOCK_HOURS: i64 = 1;
pub const MAX_BLOCK_HOURS: i64 = 720;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockOutcome {
    pub candidate: Candidate,
    pub applications_updated: usize,
}

/// Suspends candidates who miss their timelines.
///
/// Blocking is two-phase: the candidate record is written first, then each
/// affected application. If the second phase fails part way, the caller gets
/// `Error::Consistency` with the number of applications already updated.
/// Running the same operation again converges the records.
#[derive(Clone)]
pub struct BlockingService {
    store: Arc<dyn Store>,
}

impl BlockingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn block_candidate(
        &self,
        candidate_id: Uuid,
        reason: &str,
        duration_hours: i64,
        acting_admin: Option<Uuid>,
    ) -> Result<BlockOutcome> {
        if !(MIN_BLOCK_HOURS..=MAX_BLOCK_HOURS).contains(&duration_hours) {
            return Err(Error::InvalidBlockDuration(duration_hours));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::BadRequest("Block reason cannot be empty".to_string()));
        }

        let now = Utc::now();
        let until = now + Duration::hours(duration_hours);
        let mut candidate = self.candidate(candidate_id).await?;
        candidate.apply_block(reason.to_string(), until, acting_admin, now);
        self.store.update_candidate_block(&candidate).await?;

        let updated = self
            .cascade(
                candidate_id,
                &[
                    ApplicationStatus::Applied,
                    ApplicationStatus::InProgress,
                    ApplicationStatus::Blocked,
                ],
                |app| app.block(now, until),
            )
            .await
            .map_err(|(done, err)| consistency(candidate_id, "blocked", done, err))?;

        info!(
            candidate_id = %candidate_id,
            hours = duration_hours,
            blocked_until = %until,
            applications = updated,
            "candidate blocked"
        );
        Ok(BlockOutcome {
            candidate,
            applications_updated: updated,
        })
    }

    /// Safe on a candidate that is not blocked; still reopens stray blocked applications.
    pub async fn unblock_candidate(&self, candidate_id: Uuid) -> Result<BlockOutcome> {
        let now = Utc::now();
        let mut candidate = self.candidate(candidate_id).await?;
        if candidate.clear_block(now) {
            self.store.update_candidate_block(&candidate).await?;
        }

        let updated = self
            .cascade(candidate_id, &[ApplicationStatus::Blocked], |app| app.unblock(now))
            .await
            .map_err(|(done, err)| consistency(candidate_id, "unblocked", done, err))?;

        info!(candidate_id = %candidate_id, applications = updated, "candidate unblocked");
        Ok(BlockOutcome {
            candidate,
            applications_updated: updated,
        })
    }

    /// Login gate. Expired blocks are lifted, active ones refuse the login.
    pub async fn check_and_auto_unblock(&self, candidate: &Candidate) -> Result<Candidate> {
        self.check_and_auto_unblock_at(candidate, Utc::now()).await
    }

    pub async fn check_and_auto_unblock_at(
        &self,
        candidate: &Candidate,
        now: DateTime<Utc>,
    ) -> Result<Candidate> {
        match candidate.block_state(now) {
            BlockState::NotBlocked => Ok(candidate.clone()),
            BlockState::Active => {
                let notice = candidate
                    .block_notice(now)
                    .ok_or_else(|| Error::Internal("Active block without a notice".to_string()))?;
                warn!(candidate_id = %candidate.id, blocked_until = %notice.blocked_until, "login refused, account blocked");
                Err(Error::AccountBlocked(notice))
            }
            BlockState::Expired => {
                info!(candidate_id = %candidate.id, "block expired, lifting at login");
                Ok(self.unblock_candidate(candidate.id).await?.candidate)
            }
        }
    }

    async fn candidate(&self, candidate_id: Uuid) -> Result<Candidate> {
        self.store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))
    }

    /// Applies `transition` to the candidate's applications in `statuses`.
    /// On failure returns how many were already written.
    async fn cascade<F>(
        &self,
        candidate_id: Uuid,
        statuses: &[ApplicationStatus],
        transition: F,
    ) -> std::result::Result<usize, (usize, Error)>
    where
        F: Fn(&mut Application) -> bool,
    {
        let filter = ApplicationFilter::for_candidate(candidate_id).with_statuses(statuses);
        let applications = self
            .store
            .list_applications(filter)
            .await
            .map_err(|e| (0, e))?;

        let mut updated = 0;
        for application in applications {
            match self.apply(application, &transition).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => return Err((updated, e)),
            }
        }
        Ok(updated)
    }

    /// One retry on a version conflict, re-reading the record first.
    async fn apply<F>(&self, mut application: Application, transition: &F) -> Result<bool>
    where
        F: Fn(&mut Application) -> bool,
    {
        for attempt in 0..2 {
            if !transition(&mut application) {
                return Ok(false);
            }
            let expected = application.version;
            match self.store.update_application(&application, expected).await {
                Ok(_) => return Ok(true),
                Err(Error::Conflict(_)) if attempt == 0 => {
                    application = match self.store.get_application(application.id).await? {
                        Some(fresh) => fresh,
                        None => return Ok(false),
                    };
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Conflict(format!(
            "Application {} kept changing during the update",
            application.id
        )))
    }
}

fn consistency(candidate_id: Uuid, action: &str, done: usize, err: Error) -> Error {
    Error::Consistency(format!(
        "candidate {} was {} but updating their applications failed after {} change(s): {}",
        candidate_id, action, done, err
    ))
}
