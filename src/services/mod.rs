pub mod account_service;
pub mod blocking_service;
pub mod process_service;
pub mod progression_service;
pub mod timeline_watcher;
