pub mod crypto;
pub mod timeline;
pub mod token;
