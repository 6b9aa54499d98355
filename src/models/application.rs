use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::process::{Process, Round};
use crate::utils::timeline::{is_timeline_expired_at, parse_timeline_to_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Applied,
    InProgress,
    Completed,
    Blocked,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::InProgress => "in-progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "applied" => Ok(ApplicationStatus::Applied),
            "in-progress" => Ok(ApplicationStatus::InProgress),
            "completed" => Ok(ApplicationStatus::Completed),
            "blocked" => Ok(ApplicationStatus::Blocked),
            other => Err(Error::Internal(format!("Unknown application status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundStatus {
    Pending,
    InProgress,
    Submitted,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub field_id: Uuid,
    pub answer: String,
}

/// A file or link handed back by the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedFile {
    pub url: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionItem {
    pub url: String,
    pub name: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundProgress {
    pub round_id: Uuid,
    pub status: RoundStatus,
    pub answers: Vec<Answer>,
    /// Deadline exactly as the candidate entered it.
    pub timeline: Option<String>,
    pub timeline_date: Option<DateTime<Utc>>,
    pub submission: Vec<SubmissionItem>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl RoundProgress {
    fn new(round_id: Uuid, status: RoundStatus) -> Self {
        Self {
            round_id,
            status,
            answers: Vec::new(),
            timeline: None,
            timeline_date: None,
            submission: Vec::new(),
            submitted_at: None,
        }
    }

    pub fn answer_for(&self, field_id: Uuid) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.field_id == field_id)
            .map(|a| a.answer.as_str())
    }
}

fn upsert_answer(answers: &mut Vec<Answer>, field_id: Uuid, answer: String) {
    match answers.iter_mut().find(|a| a.field_id == field_id) {
        Some(existing) => existing.answer = answer,
        None => answers.push(Answer { field_id, answer }),
    }
}

pub(crate) fn check_http_url(value: &str, what: &str) -> Result<()> {
    match Url::parse(value.trim()) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(_) => Err(Error::BadRequest(format!(
            "{} must be an http or https link",
            what
        ))),
        Err(_) => Err(Error::BadRequest(format!("{} is not a valid URL", what))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Advance {
    #[serde(rename_all = "camelCase")]
    Next { round_id: Uuid, index: usize },
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub process_id: Uuid,
    pub status: ApplicationStatus,
    pub current_round_index: Option<usize>,
    pub rounds: Vec<RoundProgress>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub blocked_until: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn initialize(candidate_id: Uuid, process: &Process, now: DateTime<Utc>) -> Result<Self> {
        if process.rounds.is_empty() {
            return Err(Error::BadRequest(
                "Process has no rounds to apply to".to_string(),
            ));
        }
        let rounds = process
            .rounds
            .iter()
            .enumerate()
            .map(|(idx, round)| {
                let status = if idx == 0 {
                    RoundStatus::InProgress
                } else {
                    RoundStatus::Pending
                };
                RoundProgress::new(round.id, status)
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            candidate_id,
            process_id: process.id,
            status: ApplicationStatus::Applied,
            current_round_index: Some(0),
            rounds,
            blocked_at: None,
            blocked_until: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn progress(&self, round_id: Uuid) -> Result<&RoundProgress> {
        let pos = self.position(round_id)?;
        Ok(&self.rounds[pos])
    }

    fn position(&self, round_id: Uuid) -> Result<usize> {
        self.rounds
            .iter()
            .position(|r| r.round_id == round_id)
            .ok_or_else(|| Error::NotFound(format!("Round {} not found in application", round_id)))
    }

    pub fn current_round(&self) -> Option<&RoundProgress> {
        self.current_round_index.and_then(|idx| self.rounds.get(idx))
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.status,
            ApplicationStatus::Applied | ApplicationStatus::InProgress
        )
    }

    fn ensure_not_blocked(&self) -> Result<()> {
        if self.status == ApplicationStatus::Blocked {
            return Err(Error::Forbidden(
                "Application is blocked".to_string(),
            ));
        }
        Ok(())
    }

    fn mark_started(&mut self) {
        if self.status == ApplicationStatus::Applied {
            self.status = ApplicationStatus::InProgress;
        }
    }

    /// Saves one answer without submitting. Same field twice keeps a single entry.
    pub fn record_answer(
        &mut self,
        round: &Round,
        field_id: Uuid,
        answer: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_not_blocked()?;
        let pos = self.position(round.id)?;
        let field = round.field(field_id)?;
        if self.rounds[pos].status == RoundStatus::Submitted {
            return Err(Error::RoundAlreadySubmitted(round.id));
        }
        if field.response_type.expects_url() && !answer.trim().is_empty() {
            check_http_url(&answer, &format!("Answer to \"{}\"", field.question))?;
        }

        upsert_answer(&mut self.rounds[pos].answers, field_id, answer);
        self.mark_started();
        self.updated_at = now;
        Ok(())
    }

    /// Submits the open round. Nothing is modified when validation fails.
    pub fn submit_round(
        &mut self,
        round: &Round,
        answers: Vec<Answer>,
        files: Vec<SubmittedFile>,
        now: DateTime<Utc>,
    ) -> Result<Advance> {
        self.ensure_not_blocked()?;
        let pos = self.position(round.id)?;
        match self.rounds[pos].status {
            RoundStatus::Submitted => return Err(Error::RoundAlreadySubmitted(round.id)),
            RoundStatus::Pending => {
                return Err(Error::BadRequest(format!(
                    "Round \"{}\" is not open yet",
                    round.title
                )))
            }
            RoundStatus::Blocked => {
                return Err(Error::Forbidden("Round is blocked".to_string()))
            }
            RoundStatus::InProgress => {}
        }

        let mut merged = self.rounds[pos].answers.clone();
        for Answer { field_id, answer } in answers {
            let field = round.field(field_id)?;
            if field.response_type.expects_url() && !answer.trim().is_empty() {
                check_http_url(&answer, &format!("Answer to \"{}\"", field.question))?;
            }
            upsert_answer(&mut merged, field_id, answer);
        }

        for field in round.kind.fields().iter().filter(|f| f.required) {
            let answered = merged
                .iter()
                .any(|a| a.field_id == field.id && !a.answer.trim().is_empty());
            if !answered {
                return Err(Error::IncompleteSubmission {
                    field_id: field.id,
                    question: field.question.clone(),
                });
            }
        }

        for file in &files {
            check_http_url(&file.url, "Submission link")?;
        }

        let progress = &mut self.rounds[pos];
        progress.answers = merged;
        progress.submission.extend(files.into_iter().map(|f| SubmissionItem {
            url: f.url.trim().to_string(),
            name: f.name,
            submitted_at: now,
        }));
        progress.status = RoundStatus::Submitted;
        progress.submitted_at = Some(now);
        self.updated_at = now;

        if self.current_round_index != Some(pos) {
            // Only reachable for a round reopened by unblock after the pointer moved on.
            return Ok(self.completion_or_current());
        }

        let next = pos + 1;
        if next < self.rounds.len() {
            self.current_round_index = Some(next);
            if self.rounds[next].status != RoundStatus::Submitted {
                self.rounds[next].status = RoundStatus::InProgress;
            }
            self.mark_started();
            Ok(Advance::Next {
                round_id: self.rounds[next].round_id,
                index: next,
            })
        } else {
            self.current_round_index = None;
            self.status = ApplicationStatus::Completed;
            Ok(Advance::Completed)
        }
    }

    fn completion_or_current(&mut self) -> Advance {
        if self.rounds.iter().all(|r| r.status == RoundStatus::Submitted) {
            self.current_round_index = None;
            self.status = ApplicationStatus::Completed;
            return Advance::Completed;
        }
        match self.current_round_index {
            Some(idx) => Advance::Next {
                round_id: self.rounds[idx].round_id,
                index: idx,
            },
            None => Advance::Completed,
        }
    }

    /// First write wins: a round keeps the first timeline it was given.
    pub fn set_timeline(
        &mut self,
        round_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.ensure_not_blocked()?;
        let pos = self.position(round_id)?;
        let deadline = parse_timeline_to_date(text)
            .ok_or_else(|| Error::InvalidTimelineFormat(text.to_string()))?;

        let progress = &mut self.rounds[pos];
        if progress.status == RoundStatus::Submitted {
            return Err(Error::RoundAlreadySubmitted(round_id));
        }
        if progress.timeline.is_some() {
            return Err(Error::TimelineAlreadySet(round_id));
        }
        if deadline <= now {
            return Err(Error::BadRequest(
                "Timeline must be in the future".to_string(),
            ));
        }

        progress.timeline = Some(text.trim().to_string());
        progress.timeline_date = Some(deadline);
        self.mark_started();
        self.updated_at = now;
        Ok(deadline)
    }

    /// The open round whose timeline has passed without a submission.
    pub fn expired_timeline(&self, now: DateTime<Utc>) -> Option<&RoundProgress> {
        if !self.is_in_flight() {
            return None;
        }
        let current = self.current_round()?;
        if current.status == RoundStatus::Submitted {
            return None;
        }
        let timeline = current.timeline.as_deref()?;
        is_timeline_expired_at(timeline, now).then_some(current)
    }

    /// Returns false for applications the block does not touch.
    pub fn block(&mut self, blocked_at: DateTime<Utc>, until: DateTime<Utc>) -> bool {
        if self.status == ApplicationStatus::Completed {
            return false;
        }
        self.status = ApplicationStatus::Blocked;
        self.blocked_at = Some(blocked_at);
        self.blocked_until = Some(until);
        if let Some(idx) = self.current_round_index {
            if let Some(progress) = self.rounds.get_mut(idx) {
                if matches!(progress.status, RoundStatus::Pending | RoundStatus::InProgress) {
                    progress.status = RoundStatus::Blocked;
                }
            }
        }
        self.updated_at = blocked_at;
        true
    }

    /// Reopens blocked rounds. An expired timeline is dropped so the candidate can pick a new one.
    pub fn unblock(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != ApplicationStatus::Blocked {
            return false;
        }
        self.status = ApplicationStatus::InProgress;
        self.blocked_at = None;
        self.blocked_until = None;
        for progress in self.rounds.iter_mut().filter(|r| r.status == RoundStatus::Blocked) {
            progress.status = RoundStatus::InProgress;
            let expired = progress
                .timeline
                .as_deref()
                .is_some_and(|t| is_timeline_expired_at(t, now));
            if expired {
                progress.timeline = None;
                progress.timeline_date = None;
            }
        }
        self.updated_at = now;
        true
    }
}

/// Round whose candidate-chosen deadline passed without a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredTimeline {
    pub application_id: Uuid,
    pub candidate_id: Uuid,
    pub process_id: Uuid,
    pub round_id: Uuid,
    pub timeline: String,
    pub timeline_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedApplication {
    #[serde(flatten)]
    pub application: Application,
    pub archived_at: DateTime<Utc>,
    pub archived_by: Uuid,
}
