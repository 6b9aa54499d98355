pub mod admin_dto;
pub mod application_dto;
pub mod auth_dto;
pub mod process_dto;
