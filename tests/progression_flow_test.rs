use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use pipeline_backend::database::memory_store::MemoryStore;
use pipeline_backend::database::store::Store;
use pipeline_backend::dto::process_dto::{
    FieldPayload, ProcessPayload, RoundKindPayload, RoundPayload, UpdateProcessPayload,
};
use pipeline_backend::error::Error;
use pipeline_backend::models::application::{
    Advance, Answer, ApplicationStatus, RoundStatus, SubmittedFile,
};
use pipeline_backend::models::candidate::Candidate;
use pipeline_backend::models::process::{Process, ResponseType};
use pipeline_backend::services::process_service::ProcessService;
use pipeline_backend::services::progression_service::ProgressionService;

struct Fixture {
    store: Arc<MemoryStore>,
    processes: ProcessService,
    progression: ProgressionService,
    admin_id: Uuid,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        Self {
            processes: ProcessService::new(dyn_store.clone()),
            progression: ProgressionService::new(dyn_store),
            store,
            admin_id: Uuid::new_v4(),
        }
    }

    async fn candidate(&self, email: &str) -> Uuid {
        let candidate = Candidate::new("Test Candidate".into(), email.into(), "hash".into(), Utc::now());
        self.store.insert_candidate(&candidate).await.expect("insert candidate");
        candidate.id
    }

    /// Form round (two required fields, one optional) followed by an instruction round.
    async fn published_process(&self) -> Process {
        let payload = ProcessPayload {
            title: "Backend Engineer".into(),
            description: "Hiring pipeline".into(),
            rounds: vec![
                RoundPayload {
                    id: None,
                    title: "Screening form".into(),
                    kind: RoundKindPayload::Form {
                        fields: vec![
                            field("Why this role?", ResponseType::LongText, None),
                            field("Portfolio", ResponseType::Link, None),
                            field("Anything else?", ResponseType::ShortText, Some(false)),
                        ],
                    },
                },
                RoundPayload {
                    id: None,
                    title: "Take-home task".into(),
                    kind: RoundKindPayload::Instruction {
                        instructions: "Build a rate limiter and share the repository".into(),
                        uploads: vec![],
                    },
                },
            ],
        };
        let process = self
            .processes
            .create(self.admin_id, payload)
            .await
            .expect("create process");
        self.processes
            .publish(self.admin_id, process.id)
            .await
            .expect("publish process")
    }
}

fn field(question: &str, response_type: ResponseType, required: Option<bool>) -> FieldPayload {
    FieldPayload {
        id: None,
        question: question.into(),
        response_type,
        required,
    }
}

#[tokio::test]
async fn new_application_opens_only_the_first_round() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("first@example.com").await;

    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .expect("apply");

    assert_eq!(app.status, ApplicationStatus::Applied);
    assert_eq!(app.current_round_index, Some(0));
    assert_eq!(app.version, 0);
    assert_eq!(app.rounds.len(), process.rounds.len());
    assert_eq!(app.rounds[0].round_id, process.rounds[0].id);
    assert_eq!(app.rounds[0].status, RoundStatus::InProgress);
    assert_eq!(app.rounds[1].status, RoundStatus::Pending);
    assert!(app.rounds.iter().all(|r| r.answers.is_empty() && r.submission.is_empty()));
}

#[tokio::test]
async fn applying_twice_is_rejected_and_keeps_one_record() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("twice@example.com").await;

    fx.progression
        .initialize_application(candidate_id, process.id)
        .await
        .expect("first apply");
    let err = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateApplication));

    let apps = fx.progression.list_for_candidate(candidate_id).await.unwrap();
    assert_eq!(apps.len(), 1);
}

#[tokio::test]
async fn draft_processes_cannot_be_applied_to() {
    let fx = Fixture::new();
    let draft = fx
        .processes
        .create(
            fx.admin_id,
            ProcessPayload {
                title: "Draft".into(),
                description: String::new(),
                rounds: vec![],
            },
        )
        .await
        .unwrap();
    let candidate_id = fx.candidate("draft@example.com").await;

    let err = fx
        .progression
        .initialize_application(candidate_id, draft.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = fx.processes.publish(fx.admin_id, draft.id).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn recording_the_same_field_twice_keeps_one_answer() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("answers@example.com").await;
    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();
    let round = &process.rounds[0];
    let field_id = round.kind.fields()[0].id;

    fx.progression
        .record_answer(candidate_id, app.id, round.id, field_id, "First draft".into())
        .await
        .unwrap();
    let app = fx
        .progression
        .record_answer(candidate_id, app.id, round.id, field_id, "Final answer".into())
        .await
        .unwrap();

    let progress = &app.rounds[0];
    assert_eq!(progress.answers.len(), 1);
    assert_eq!(progress.answer_for(field_id), Some("Final answer"));
    assert_eq!(progress.status, RoundStatus::InProgress);
    assert_eq!(app.status, ApplicationStatus::InProgress);
    assert_eq!(app.version, 2);
}

#[tokio::test]
async fn link_answers_must_be_urls() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("links@example.com").await;
    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();
    let round = &process.rounds[0];
    let link_field = round.kind.fields()[1].id;

    let err = fx
        .progression
        .record_answer(candidate_id, app.id, round.id, link_field, "not a link".into())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn incomplete_submission_changes_nothing() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("incomplete@example.com").await;
    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();
    let round = &process.rounds[0];
    let fields = round.kind.fields();

    let err = fx
        .progression
        .submit_round(
            candidate_id,
            app.id,
            round.id,
            vec![
                Answer {
                    field_id: fields[0].id,
                    answer: "   ".into(),
                },
                Answer {
                    field_id: fields[1].id,
                    answer: "https://example.com/me".into(),
                },
            ],
            vec![],
        )
        .await
        .unwrap_err();
    match err {
        Error::IncompleteSubmission { field_id, .. } => assert_eq!(field_id, fields[0].id),
        other => panic!("expected IncompleteSubmission, got {other:?}"),
    }

    let stored = fx.progression.get_for_candidate(candidate_id, app.id).await.unwrap();
    assert_eq!(stored.rounds[0].status, RoundStatus::InProgress);
    assert!(stored.rounds[0].answers.is_empty());
    assert!(stored.rounds[0].submitted_at.is_none());
    assert_eq!(stored.current_round_index, Some(0));
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn submitting_every_round_completes_the_application() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("complete@example.com").await;
    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();
    let form = &process.rounds[0];
    let task = &process.rounds[1];
    let fields = form.kind.fields();

    let err = fx
        .progression
        .submit_round(candidate_id, app.id, task.id, vec![], vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)), "pending round is not open");

    let (app, advance) = fx
        .progression
        .submit_round(
            candidate_id,
            app.id,
            form.id,
            vec![
                Answer {
                    field_id: fields[0].id,
                    answer: "I like distributed systems".into(),
                },
                Answer {
                    field_id: fields[1].id,
                    answer: "https://example.com/portfolio".into(),
                },
            ],
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(
        advance,
        Advance::Next {
            round_id: task.id,
            index: 1
        }
    );
    assert_eq!(app.current_round_index, Some(1));
    assert_eq!(app.rounds[0].status, RoundStatus::Submitted);
    assert!(app.rounds[0].submitted_at.is_some());
    assert_eq!(app.rounds[1].status, RoundStatus::InProgress);
    assert_eq!(app.status, ApplicationStatus::InProgress);

    let (app, advance) = fx
        .progression
        .submit_round(
            candidate_id,
            app.id,
            task.id,
            vec![],
            vec![SubmittedFile {
                url: "https://github.com/example/limiter".into(),
                name: Some("repository".into()),
            }],
        )
        .await
        .unwrap();
    assert_eq!(advance, Advance::Completed);
    assert_eq!(app.status, ApplicationStatus::Completed);
    assert_eq!(app.current_round_index, None);
    assert_eq!(app.rounds[1].submission.len(), 1);

    let err = fx
        .progression
        .submit_round(candidate_id, app.id, task.id, vec![], vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RoundAlreadySubmitted(id) if id == task.id));
}

#[tokio::test]
async fn timeline_is_first_write_wins() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("timeline@example.com").await;
    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();
    let round_id = process.rounds[0].id;

    let err = fx
        .progression
        .set_timeline(candidate_id, app.id, round_id, "sometime next week")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTimelineFormat(_)));

    let err = fx
        .progression
        .set_timeline(candidate_id, app.id, round_id, "1 Jan 2001, 9:00 am")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let app = fx
        .progression
        .set_timeline(candidate_id, app.id, round_id, "22 Nov 2099, 8:53 pm")
        .await
        .unwrap();
    let progress = app.progress(round_id).unwrap();
    assert_eq!(progress.timeline.as_deref(), Some("22 Nov 2099, 8:53 pm"));
    assert_eq!(
        progress.timeline_date.map(|d| d.to_rfc3339()),
        Some("2099-11-22T20:53:00+00:00".to_string())
    );

    let err = fx
        .progression
        .set_timeline(candidate_id, app.id, round_id, "23 Nov 2099, 8:53 pm")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TimelineAlreadySet(id) if id == round_id));
}

#[tokio::test]
async fn other_candidates_cannot_see_an_application() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let owner = fx.candidate("owner@example.com").await;
    let stranger = fx.candidate("stranger@example.com").await;
    let app = fx
        .progression
        .initialize_application(owner, process.id)
        .await
        .unwrap();

    let err = fx.progression.get_for_candidate(stranger, app.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("stale@example.com").await;
    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();

    let first = fx.store.get_application(app.id).await.unwrap().unwrap();
    let second = first.clone();
    let version = fx.store.update_application(&first, first.version).await.unwrap();
    assert_eq!(version, 1);

    let err = fx
        .store
        .update_application(&second, second.version)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn archiving_keeps_a_copy_and_removes_the_live_record() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("archive@example.com").await;
    let app = fx
        .progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();

    let err = fx
        .progression
        .archive_application(Uuid::new_v4(), app.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let archived = fx
        .progression
        .archive_application(fx.admin_id, app.id)
        .await
        .unwrap();
    assert_eq!(archived.archived_by, fx.admin_id);
    assert!(fx.store.get_application(app.id).await.unwrap().is_none());
    let copy = fx.store.get_archived_application(app.id).await.unwrap().unwrap();
    assert_eq!(copy.application.candidate_id, candidate_id);

    // The candidate may apply again once the old record is archived.
    fx.progression
        .initialize_application(candidate_id, process.id)
        .await
        .expect("re-apply after archive");
}

#[tokio::test]
async fn published_rounds_are_frozen_and_types_are_fixed() {
    let fx = Fixture::new();
    let process = fx.published_process().await;

    let err = fx
        .processes
        .update(
            fx.admin_id,
            process.id,
            UpdateProcessPayload {
                title: None,
                description: None,
                rounds: Some(vec![]),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let renamed = fx
        .processes
        .update(
            fx.admin_id,
            process.id,
            UpdateProcessPayload {
                title: Some("Senior Backend Engineer".into()),
                description: None,
                rounds: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.title, "Senior Backend Engineer");
    assert_eq!(renamed.rounds.len(), 2);

    let err = fx
        .processes
        .get(Uuid::new_v4(), process.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn processes_with_applications_cannot_be_deleted() {
    let fx = Fixture::new();
    let process = fx.published_process().await;
    let candidate_id = fx.candidate("delete@example.com").await;
    fx.progression
        .initialize_application(candidate_id, process.id)
        .await
        .unwrap();

    let err = fx.processes.delete(fx.admin_id, process.id).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}
