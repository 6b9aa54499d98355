pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::store::Store;
use crate::services::{
    account_service::AccountService, blocking_service::BlockingService,
    process_service::ProcessService, progression_service::ProgressionService,
    timeline_watcher::TimelineWatcher,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub process_service: ProcessService,
    pub progression_service: ProgressionService,
    pub blocking_service: BlockingService,
    pub account_service: AccountService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        let process_service = ProcessService::new(store.clone());
        let progression_service = ProgressionService::new(store.clone());
        let blocking_service = BlockingService::new(store.clone());
        let account_service = AccountService::new(
            store,
            blocking_service.clone(),
            config.jwt_secret.clone(),
            config.token_ttl_hours,
        );

        Self {
            config,
            process_service,
            progression_service,
            blocking_service,
            account_service,
        }
    }

    pub fn timeline_watcher(&self) -> TimelineWatcher {
        TimelineWatcher::new(
            self.progression_service.clone(),
            self.blocking_service.clone(),
            self.config.auto_block_hours,
        )
    }
}
