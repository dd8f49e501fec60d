//! Database access layer for nahuel-api
//!
//! Read helpers take the pool; statements that belong to a write workflow
//! take the transaction's connection so they join its scope.

pub mod catalog;
pub mod lookup;
pub mod monitored;
pub mod resolutions;
pub mod titles;

pub use monitored::{begin_monitored, MonitoredTransaction};
