pub mod admin;
pub mod application;
pub mod candidate;
pub mod process;
