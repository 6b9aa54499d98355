use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_blocked: bool,
    pub blocked_reason: Option<String>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub blocked_until: Option<DateTime<Utc>>,
    /// Acting admin; `None` when the timeline watcher blocked the account.
    pub blocked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a blocked candidate is told when login is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNotice {
    pub reason: String,
    pub blocked_until: DateTime<Utc>,
    pub hours_remaining: i64,
    pub minutes_remaining: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    NotBlocked,
    Active,
    Expired,
}

impl Candidate {
    pub fn new(name: String, email: String, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            is_blocked: false,
            blocked_reason: None,
            blocked_at: None,
            blocked_until: None,
            blocked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn block_state(&self, now: DateTime<Utc>) -> BlockState {
        if !self.is_blocked {
            return BlockState::NotBlocked;
        }
        match self.blocked_until {
            Some(until) if until > now => BlockState::Active,
            _ => BlockState::Expired,
        }
    }

    /// Overwrites any previous block window.
    pub fn apply_block(
        &mut self,
        reason: String,
        until: DateTime<Utc>,
        blocked_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) {
        self.is_blocked = true;
        self.blocked_reason = Some(reason);
        self.blocked_at = Some(now);
        self.blocked_until = Some(until);
        self.blocked_by = blocked_by;
        self.updated_at = now;
    }

    /// Returns false when there was nothing to clear.
    pub fn clear_block(&mut self, now: DateTime<Utc>) -> bool {
        let had_block = self.is_blocked || self.blocked_until.is_some();
        self.is_blocked = false;
        self.blocked_reason = None;
        self.blocked_at = None;
        self.blocked_until = None;
        self.blocked_by = None;
        if had_block {
            self.updated_at = now;
        }
        had_block
    }

    pub fn block_notice(&self, now: DateTime<Utc>) -> Option<BlockNotice> {
        if self.block_state(now) != BlockState::Active {
            return None;
        }
        let until = self.blocked_until?;
        let remaining = (until - now).max(Duration::zero());
        Some(BlockNotice {
            reason: self
                .blocked_reason
                .clone()
                .unwrap_or_else(|| "Account blocked".to_string()),
            blocked_until: until,
            hours_remaining: remaining.num_hours(),
            minutes_remaining: remaining.num_minutes() % 60,
        })
    }
}
