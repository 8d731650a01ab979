//! Data models shared by the extraction engine and its collaborators.

pub mod config;
pub mod receipt;
pub mod transaction;
