//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and the DTOs used to insert or transition it.

pub mod diagnosis;
pub mod diagnosis_job;
pub mod status;
pub mod user;
