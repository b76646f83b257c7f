//! Core data models for the case intake service.
//!
//! Cases and stored objects map to SQLite rows via `sqlx::FromRow`; file
//! records are the JSON entries of each container's manifest.

pub mod case;
pub mod file_record;
pub mod object;
pub mod upload;
