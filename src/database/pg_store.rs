use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::store::{ApplicationFilter, ProcessFilter, Store};
use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::application::{Application, ArchivedApplication, RoundProgress};
use crate::models::candidate::Candidate;
use crate::models::process::{Process, Round};

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[derive(FromRow)]
struct ProcessRow {
    id: Uuid,
    title: String,
    description: String,
    rounds: Json<Vec<Round>>,
    status: String,
    admin_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProcessRow> for Process {
    type Error = Error;

    fn try_from(row: ProcessRow) -> Result<Self> {
        Ok(Process {
            id: row.id,
            title: row.title,
            description: row.description,
            rounds: row.rounds.0,
            status: row.status.parse()?,
            admin_id: row.admin_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    candidate_id: Uuid,
    process_id: Uuid,
    status: String,
    current_round_index: Option<i32>,
    rounds: Json<Vec<RoundProgress>>,
    blocked_at: Option<DateTime<Utc>>,
    blocked_until: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Application {
            id: row.id,
            candidate_id: row.candidate_id,
            process_id: row.process_id,
            status: row.status.parse()?,
            current_round_index: row.current_round_index.map(|idx| idx.max(0) as usize),
            rounds: row.rounds.0,
            blocked_at: row.blocked_at,
            blocked_until: row.blocked_until,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ArchivedRow {
    document: Json<Application>,
    archived_at: DateTime<Utc>,
    archived_by: Uuid,
}

/// PostgreSQL adapter. Embedded rounds and progress live in JSONB columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_admin(&self, admin: &Admin) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO admins (id, name, email, password_hash, created_at) VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(admin.id)
        .bind(&admin.name)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(admin.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("Admin {} already exists", admin.email))
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }

    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"SELECT id, name, email, password_hash, created_at FROM admins WHERE lower(email) = lower($1)"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO candidates (
                id, name, email, password_hash, is_blocked, blocked_reason,
                blocked_at, blocked_until, blocked_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(&candidate.password_hash)
        .bind(candidate.is_blocked)
        .bind(&candidate.blocked_reason)
        .bind(candidate.blocked_at)
        .bind(candidate.blocked_until)
        .bind(candidate.blocked_by)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("Email is already registered".to_string())
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(r#"SELECT * FROM candidates WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(candidate)
    }

    async fn get_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE lower(email) = lower($1)"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn update_candidate_block(&self, candidate: &Candidate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET is_blocked = $2, blocked_reason = $3, blocked_at = $4,
                blocked_until = $5, blocked_by = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(candidate.id)
        .bind(candidate.is_blocked)
        .bind(&candidate.blocked_reason)
        .bind(candidate.blocked_at)
        .bind(candidate.blocked_until)
        .bind(candidate.blocked_by)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Candidate {} not found", candidate.id)));
        }
        Ok(())
    }

    async fn insert_process(&self, process: &Process) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO processes (id, title, description, rounds, status, admin_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(process.id)
        .bind(&process.title)
        .bind(&process.description)
        .bind(Json(&process.rounds))
        .bind(process.status.as_str())
        .bind(process.admin_id)
        .bind(process.created_at)
        .bind(process.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_process(&self, id: Uuid) -> Result<Option<Process>> {
        sqlx::query_as::<_, ProcessRow>(r#"SELECT * FROM processes WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Process::try_from)
            .transpose()
    }

    async fn list_processes(&self, filter: ProcessFilter) -> Result<Vec<Process>> {
        let rows = sqlx::query_as::<_, ProcessRow>(
            r#"
            SELECT * FROM processes
            WHERE ($1::uuid IS NULL OR admin_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.admin_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Process::try_from).collect()
    }

    async fn update_process(&self, process: &Process) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE processes
            SET title = $2, description = $3, rounds = $4, status = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(process.id)
        .bind(&process.title)
        .bind(&process.description)
        .bind(Json(&process.rounds))
        .bind(process.status.as_str())
        .bind(process.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Process {} not found", process.id)));
        }
        Ok(())
    }

    async fn delete_process(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM processes WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Process {} not found", id)));
        }
        Ok(())
    }

    async fn insert_application(&self, application: &Application) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO applications (
                id, candidate_id, process_id, status, current_round_index, rounds,
                blocked_at, blocked_until, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(application.id)
        .bind(application.candidate_id)
        .bind(application.process_id)
        .bind(application.status.as_str())
        .bind(application.current_round_index.map(|idx| idx as i32))
        .bind(Json(&application.rounds))
        .bind(application.blocked_at)
        .bind(application.blocked_until)
        .bind(application.version)
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::DuplicateApplication
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        sqlx::query_as::<_, ApplicationRow>(r#"SELECT * FROM applications WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Application::try_from)
            .transpose()
    }

    async fn find_application(&self, candidate_id: Uuid, process_id: Uuid) -> Result<Option<Application>> {
        sqlx::query_as::<_, ApplicationRow>(
            r#"SELECT * FROM applications WHERE candidate_id = $1 AND process_id = $2"#,
        )
        .bind(candidate_id)
        .bind(process_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Application::try_from)
        .transpose()
    }

    async fn list_applications(&self, filter: ApplicationFilter) -> Result<Vec<Application>> {
        let statuses: Option<Vec<String>> = filter
            .statuses
            .map(|list| list.iter().map(|s| s.as_str().to_string()).collect());
        let rows = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT * FROM applications
            WHERE ($1::uuid IS NULL OR candidate_id = $1)
              AND ($2::uuid IS NULL OR process_id = $2)
              AND ($3::text[] IS NULL OR status = ANY($3))
            ORDER BY created_at ASC
            "#,
        )
        .bind(filter.candidate_id)
        .bind(filter.process_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn update_application(&self, application: &Application, expected_version: i64) -> Result<i64> {
        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE applications
            SET status = $3, current_round_index = $4, rounds = $5,
                blocked_at = $6, blocked_until = $7, updated_at = $8,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(application.id)
        .bind(expected_version)
        .bind(application.status.as_str())
        .bind(application.current_round_index.map(|idx| idx as i32))
        .bind(Json(&application.rounds))
        .bind(application.blocked_at)
        .bind(application.blocked_until)
        .bind(application.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(version) = version {
            return Ok(version);
        }
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM applications WHERE id = $1)"#)
                .bind(application.id)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Err(Error::Conflict(
                "Application was modified concurrently, retry the request".to_string(),
            ))
        } else {
            Err(Error::NotFound(format!("Application {} not found", application.id)))
        }
    }

    async fn archive_application(&self, archived: &ArchivedApplication) -> Result<()> {
        let app = &archived.application;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO archived_applications (id, candidate_id, process_id, document, archived_at, archived_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET document = EXCLUDED.document, archived_at = EXCLUDED.archived_at, archived_by = EXCLUDED.archived_by
            "#,
        )
        .bind(app.id)
        .bind(app.candidate_id)
        .bind(app.process_id)
        .bind(Json(app))
        .bind(archived.archived_at)
        .bind(archived.archived_by)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query(r#"DELETE FROM applications WHERE id = $1"#)
            .bind(app.id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(Error::NotFound(format!("Application {} not found", app.id)));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_archived_application(&self, id: Uuid) -> Result<Option<ArchivedApplication>> {
        let row = sqlx::query_as::<_, ArchivedRow>(
            r#"SELECT document, archived_at, archived_by FROM archived_applications WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| ArchivedApplication {
            application: r.document.0,
            archived_at: r.archived_at,
            archived_by: r.archived_by,
        }))
    }
}
