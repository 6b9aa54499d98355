use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::BootstrapAdmin;
use crate::database::store::Store;
use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::candidate::Candidate;
use crate::services::blocking_service::BlockingService;
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::{issue_token, Role};

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    blocking: BlockingService,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        blocking: BlockingService,
        jwt_secret: String,
        token_ttl_hours: i64,
    ) -> Self {
        Self {
            store,
            blocking,
            jwt_secret,
            token_ttl_hours,
        }
    }

    pub fn token_ttl_hours(&self) -> i64 {
        self.token_ttl_hours
    }

    pub async fn register_candidate(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Candidate> {
        let email = normalize_email(email);
        if self.store.get_candidate_by_email(&email).await?.is_some() {
            return Err(Error::Conflict(format!("Email {} is already registered", email)));
        }
        let candidate = Candidate::new(
            name.trim().to_string(),
            email,
            hash_password(password)?,
            Utc::now(),
        );
        self.store.insert_candidate(&candidate).await?;
        info!(candidate_id = %candidate.id, "candidate registered");
        Ok(candidate)
    }

    /// Block state is checked before the password. Expired blocks are lifted here.
    pub async fn login_candidate(&self, email: &str, password: &str) -> Result<(Candidate, String)> {
        let email = normalize_email(email);
        let candidate = self
            .store
            .get_candidate_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;

        let candidate = self.blocking.check_and_auto_unblock(&candidate).await?;

        if !verify_password(password, &candidate.password_hash)? {
            warn!(candidate_id = %candidate.id, "candidate login with wrong password");
            return Err(invalid_credentials());
        }
        let token = issue_token(&self.jwt_secret, candidate.id, Role::Candidate, self.token_ttl_hours)?;
        Ok((candidate, token))
    }

    pub async fn login_admin(&self, email: &str, password: &str) -> Result<(Admin, String)> {
        let email = normalize_email(email);
        let admin = self
            .store
            .get_admin_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;
        if !verify_password(password, &admin.password_hash)? {
            warn!(admin_id = %admin.id, "admin login with wrong password");
            return Err(invalid_credentials());
        }
        let token = issue_token(&self.jwt_secret, admin.id, Role::Admin, self.token_ttl_hours)?;
        Ok((admin, token))
    }

    pub async fn get_candidate(&self, candidate_id: Uuid) -> Result<Candidate> {
        self.store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))
    }

    /// Returns true when the admin had to be created.
    pub async fn ensure_bootstrap_admin(&self, bootstrap: &BootstrapAdmin) -> Result<bool> {
        let email = normalize_email(&bootstrap.email);
        if self.store.get_admin_by_email(&email).await?.is_some() {
            return Ok(false);
        }
        let admin = Admin {
            id: Uuid::new_v4(),
            name: bootstrap.name.clone(),
            email,
            password_hash: hash_password(&bootstrap.password)?,
            created_at: Utc::now(),
        };
        self.store.insert_admin(&admin).await?;
        info!(admin_id = %admin.id, email = %admin.email, "bootstrap admin created");
        Ok(true)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("Invalid email or password".to_string())
}
