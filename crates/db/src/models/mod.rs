//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts

pub mod job;
pub mod project;
pub mod usage_log;
pub mod worker;
pub mod workspace_asset;
