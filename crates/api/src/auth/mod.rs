//! Authentication primitives.
//!
//! Tokens are issued by the social-login flow; this service only validates
//! them and, for tests and tooling, can mint them with the shared secret.

pub mod jwt;
