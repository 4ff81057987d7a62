//! Diagnosis execution engine.
//!
//! [`dispatcher`] claims queued diagnosis jobs and runs them on a bounded
//! worker pool, [`analysis`] drives the two provider calls and synthesis
//! for one job, and [`finalize`] writes the terminal state.

pub mod analysis;
pub mod dispatcher;
pub mod finalize;
