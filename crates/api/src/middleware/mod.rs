//! Request extractors and guards.

pub mod auth;
pub mod rate_limit;
