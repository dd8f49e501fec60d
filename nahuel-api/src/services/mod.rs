//! Write workflows
//!
//! Each workflow validates its input before borrowing a connection, then
//! runs its statements in one monitored transaction.

pub mod resolution;
pub mod title_update;

pub use resolution::{get_or_create, ResolutionInput, ResolutionOutcome};
pub use title_update::{update_title, TitleUpdatePayload};
