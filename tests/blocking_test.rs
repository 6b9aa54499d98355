use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use pipeline_backend::database::memory_store::MemoryStore;
use pipeline_backend::database::store::Store;
use pipeline_backend::dto::process_dto::{
    FieldPayload, ProcessPayload, RoundKindPayload, RoundPayload,
};
use pipeline_backend::error::Error;
use pipeline_backend::models::application::{Application, ApplicationStatus, RoundStatus};
use pipeline_backend::models::process::{Process, ResponseType};
use pipeline_backend::services::account_service::AccountService;
use pipeline_backend::services::blocking_service::BlockingService;
use pipeline_backend::services::process_service::ProcessService;
use pipeline_backend::services::progression_service::ProgressionService;
use pipeline_backend::services::timeline_watcher::{SweepReport, TimelineWatcher};
use pipeline_backend::utils::timeline::parse_timeline_to_date;

const PASSWORD: &str = "correct horse battery";

struct Fixture {
    store: Arc<MemoryStore>,
    processes: ProcessService,
    progression: ProgressionService,
    blocking: BlockingService,
    accounts: AccountService,
    admin_id: Uuid,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        let blocking = BlockingService::new(dyn_store.clone());
        Self {
            processes: ProcessService::new(dyn_store.clone()),
            progression: ProgressionService::new(dyn_store.clone()),
            accounts: AccountService::new(
                dyn_store,
                blocking.clone(),
                "blocking_test_secret".into(),
                1,
            ),
            blocking,
            store,
            admin_id: Uuid::new_v4(),
        }
    }

    async fn process(&self) -> Process {
        let process = self
            .processes
            .create(
                self.admin_id,
                ProcessPayload {
                    title: "Data Analyst".into(),
                    description: String::new(),
                    rounds: vec![RoundPayload {
                        id: None,
                        title: "Case study".into(),
                        kind: RoundKindPayload::Form {
                            fields: vec![FieldPayload {
                                id: None,
                                question: "Link to your analysis".into(),
                                response_type: ResponseType::Link,
                                required: None,
                            }],
                        },
                    }],
                },
            )
            .await
            .unwrap();
        self.processes.publish(self.admin_id, process.id).await.unwrap()
    }

    async fn candidate_with_application(&self, email: &str) -> (Uuid, Application) {
        let candidate = self
            .accounts
            .register_candidate("Blocked Candidate", email, PASSWORD)
            .await
            .unwrap();
        let process = self.process().await;
        let app = self
            .progression
            .initialize_application(candidate.id, process.id)
            .await
            .unwrap();
        (candidate.id, app)
    }

    async fn expire_timeline(&self, application_id: Uuid) {
        let mut app = self.store.get_application(application_id).await.unwrap().unwrap();
        let text = "1 Jan 2020, 9:00 am";
        app.rounds[0].timeline = Some(text.into());
        app.rounds[0].timeline_date = parse_timeline_to_date(text);
        self.store.update_application(&app, app.version).await.unwrap();
    }
}

#[tokio::test]
async fn blocking_covers_candidate_and_open_applications() {
    let fx = Fixture::new();
    let (candidate_id, app) = fx.candidate_with_application("block@example.com").await;
    let admin = Uuid::new_v4();

    let before = Utc::now();
    let outcome = fx
        .blocking
        .block_candidate(candidate_id, "Missed two deadlines", 24, Some(admin))
        .await
        .unwrap();
    assert_eq!(outcome.applications_updated, 1);

    let candidate = fx.store.get_candidate(candidate_id).await.unwrap().unwrap();
    assert!(candidate.is_blocked);
    assert_eq!(candidate.blocked_reason.as_deref(), Some("Missed two deadlines"));
    assert_eq!(candidate.blocked_by, Some(admin));
    let until = candidate.blocked_until.unwrap();
    assert!(until >= before + Duration::hours(24));
    assert!(until <= Utc::now() + Duration::hours(24));

    let app = fx.store.get_application(app.id).await.unwrap().unwrap();
    assert_eq!(app.status, ApplicationStatus::Blocked);
    assert_eq!(app.blocked_until, Some(until));
    assert_eq!(app.rounds[0].status, RoundStatus::Blocked);
}

#[tokio::test]
async fn duration_must_be_between_one_hour_and_thirty_days() {
    let fx = Fixture::new();
    let (candidate_id, _) = fx.candidate_with_application("bounds@example.com").await;

    for hours in [0, 721] {
        let err = fx
            .blocking
            .block_candidate(candidate_id, "late", hours, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBlockDuration(h) if h == hours));
    }
    for hours in [1, 720] {
        fx.blocking
            .block_candidate(candidate_id, "late", hours, None)
            .await
            .expect("duration within bounds");
    }
}

#[tokio::test]
async fn reblocking_replaces_the_previous_window() {
    let fx = Fixture::new();
    let (candidate_id, app) = fx.candidate_with_application("reblock@example.com").await;

    fx.blocking
        .block_candidate(candidate_id, "first", 720, None)
        .await
        .unwrap();
    let outcome = fx
        .blocking
        .block_candidate(candidate_id, "second", 1, None)
        .await
        .unwrap();
    assert_eq!(outcome.applications_updated, 1);

    let candidate = fx.store.get_candidate(candidate_id).await.unwrap().unwrap();
    assert_eq!(candidate.blocked_reason.as_deref(), Some("second"));
    let until = candidate.blocked_until.unwrap();
    assert!(until < Utc::now() + Duration::hours(2));

    let app = fx.store.get_application(app.id).await.unwrap().unwrap();
    assert_eq!(app.status, ApplicationStatus::Blocked);
    assert_eq!(app.blocked_until, Some(until));
}

#[tokio::test]
async fn unblocking_a_candidate_who_is_not_blocked_changes_nothing() {
    let fx = Fixture::new();
    let (candidate_id, app) = fx.candidate_with_application("never@example.com").await;

    let outcome = fx.blocking.unblock_candidate(candidate_id).await.unwrap();
    assert_eq!(outcome.applications_updated, 0);
    assert!(!outcome.candidate.is_blocked);

    let stored = fx.store.get_application(app.id).await.unwrap().unwrap();
    assert_eq!(stored.status, app.status);
    assert_eq!(stored.version, app.version);
}

#[tokio::test]
async fn active_block_refuses_login_with_remaining_time() {
    let fx = Fixture::new();
    let (candidate_id, _) = fx.candidate_with_application("active@example.com").await;
    fx.blocking
        .block_candidate(candidate_id, "Missed timeline", 5, None)
        .await
        .unwrap();

    let err = fx
        .accounts
        .login_candidate("active@example.com", PASSWORD)
        .await
        .unwrap_err();
    match err {
        Error::AccountBlocked(notice) => {
            assert_eq!(notice.reason, "Missed timeline");
            assert!(notice.hours_remaining == 4 || notice.hours_remaining == 5);
            assert!((0..60).contains(&notice.minutes_remaining));
        }
        other => panic!("expected AccountBlocked, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_block_is_lifted_at_login() {
    let fx = Fixture::new();
    let (candidate_id, app) = fx.candidate_with_application("expired@example.com").await;

    let now = Utc::now();
    let mut candidate = fx.store.get_candidate(candidate_id).await.unwrap().unwrap();
    candidate.apply_block("Old block".into(), now - Duration::hours(1), None, now - Duration::hours(25));
    fx.store.update_candidate_block(&candidate).await.unwrap();
    let mut blocked = fx.store.get_application(app.id).await.unwrap().unwrap();
    assert!(blocked.block(now - Duration::hours(25), now - Duration::hours(1)));
    fx.store.update_application(&blocked, blocked.version).await.unwrap();

    let (candidate, token) = fx
        .accounts
        .login_candidate("expired@example.com", PASSWORD)
        .await
        .expect("login after block expired");
    assert!(!token.is_empty());
    assert!(!candidate.is_blocked);
    assert!(candidate.blocked_until.is_none());

    let app = fx.store.get_application(app.id).await.unwrap().unwrap();
    assert_eq!(app.status, ApplicationStatus::InProgress);
    assert_eq!(app.rounds[0].status, RoundStatus::InProgress);
    assert!(app.blocked_at.is_none());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let fx = Fixture::new();
    fx.candidate_with_application("wrong@example.com").await;
    let err = fx
        .accounts
        .login_candidate("wrong@example.com", "not the password")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn completed_applications_are_not_blocked() {
    let fx = Fixture::new();
    let (candidate_id, app) = fx.candidate_with_application("done@example.com").await;
    let process = fx.store.get_process(app.process_id).await.unwrap().unwrap();
    let round = &process.rounds[0];
    fx.progression
        .record_answer(
            candidate_id,
            app.id,
            round.id,
            round.kind.fields()[0].id,
            "https://example.com/analysis".into(),
        )
        .await
        .unwrap();
    fx.progression
        .submit_round(candidate_id, app.id, round.id, vec![], vec![])
        .await
        .unwrap();

    let outcome = fx
        .blocking
        .block_candidate(candidate_id, "late elsewhere", 2, None)
        .await
        .unwrap();
    assert_eq!(outcome.applications_updated, 0);
    let app = fx.store.get_application(app.id).await.unwrap().unwrap();
    assert_eq!(app.status, ApplicationStatus::Completed);
}

#[tokio::test]
async fn watcher_reports_without_blocking_by_default() {
    let fx = Fixture::new();
    let (candidate_id, app) = fx.candidate_with_application("report@example.com").await;
    fx.expire_timeline(app.id).await;

    let watcher = TimelineWatcher::new(fx.progression.clone(), fx.blocking.clone(), None);
    let report = watcher.run_once(Utc::now()).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            expired: 1,
            blocked: 0,
            failed: 0
        }
    );
    let candidate = fx.store.get_candidate(candidate_id).await.unwrap().unwrap();
    assert!(!candidate.is_blocked);
}

#[tokio::test]
async fn watcher_blocks_candidates_who_missed_a_timeline() {
    let fx = Fixture::new();
    let (candidate_id, app) = fx.candidate_with_application("watch@example.com").await;
    fx.expire_timeline(app.id).await;

    let expired = fx.progression.expired_timelines(Utc::now()).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].application_id, app.id);
    assert_eq!(expired[0].timeline, "1 Jan 2020, 9:00 am");

    let watcher = TimelineWatcher::new(fx.progression.clone(), fx.blocking.clone(), Some(48));
    let report = watcher.run_once(Utc::now()).await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.blocked, 1);

    let candidate = fx.store.get_candidate(candidate_id).await.unwrap().unwrap();
    assert!(candidate.is_blocked);
    assert_eq!(
        candidate.blocked_reason.as_deref(),
        Some("Missed timeline for round \"Case study\"")
    );
    assert!(candidate.blocked_by.is_none());

    let again = watcher.run_once(Utc::now()).await.unwrap();
    assert_eq!(again, SweepReport::default());

    fx.blocking.unblock_candidate(candidate_id).await.unwrap();
    let app = fx.store.get_application(app.id).await.unwrap().unwrap();
    assert_eq!(app.status, ApplicationStatus::InProgress);
    assert!(app.rounds[0].timeline.is_none());
    assert!(fx.progression.expired_timelines(Utc::now()).await.unwrap().is_empty());
}
