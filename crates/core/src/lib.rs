//! Domain logic shared by the Sikjipsa backend crates.
//!
//! Nothing in here touches the network or the database: upload validation
//! rules live in [`image_intake`], and the merge of provider responses into
//! a stored diagnosis lives in [`diagnosis`].

pub mod diagnosis;
pub mod error;
pub mod image_intake;
pub mod types;
