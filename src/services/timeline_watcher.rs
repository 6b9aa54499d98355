use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::services::blocking_service::BlockingService;
use crate::services::progression_service::ProgressionService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub blocked: usize,
    pub failed: usize,
}

/// Periodic sweep for missed timelines. Without `auto_block_hours` it only reports.
#[derive(Clone)]
pub struct TimelineWatcher {
    progression: ProgressionService,
    blocking: BlockingService,
    auto_block_hours: Option<i64>,
}

impl TimelineWatcher {
    pub fn new(
        progression: ProgressionService,
        blocking: BlockingService,
        auto_block_hours: Option<i64>,
    ) -> Self {
        Self {
            progression,
            blocking,
            auto_block_hours,
        }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let expired = self.progression.expired_timelines(now).await?;
        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };
        if expired.is_empty() {
            return Ok(report);
        }

        let Some(hours) = self.auto_block_hours else {
            for item in &expired {
                warn!(
                    application_id = %item.application_id,
                    candidate_id = %item.candidate_id,
                    round_id = %item.round_id,
                    timeline = %item.timeline,
                    "timeline expired"
                );
            }
            return Ok(report);
        };

        let mut handled = HashSet::new();
        for item in expired {
            if !handled.insert(item.candidate_id) {
                continue;
            }
            let title = self
                .progression
                .round_title(item.process_id, item.round_id)
                .await
                .unwrap_or_else(|_| item.round_id.to_string());
            let reason = format!("Missed timeline for round \"{}\"", title);

            match self
                .blocking
                .block_candidate(item.candidate_id, &reason, hours, None)
                .await
            {
                Ok(_) => report.blocked += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(candidate_id = %item.candidate_id, error = %e, "auto-block failed");
                }
            }
        }

        info!(
            expired = report.expired,
            blocked = report.blocked,
            failed = report.failed,
            "timeline sweep finished"
        );
        Ok(report)
    }
}
