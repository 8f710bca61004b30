//! # Court Scan
//!
//! This crate provides the availability checker: it scans a booking site's daily
//! schedule pages, diffs the available slots against the previous run, emails
//! subscribers about new slots and alerts an administrator when the checker keeps
//! failing.

/// Configuration read from the environment
mod config;
pub use config::*;

/// Comparison of fresh and persisted snapshots
mod differ;
pub use differ::*;

/// One full check run
mod executor;
pub use executor::*;

/// Availability email formatting and delivery
mod notification_service;
pub use notification_service::*;

/// Append-only error and info logs
mod run_log;
pub use run_log::*;

/// Slot identifiers, snapshots and scan errors
mod scan_types;
pub use scan_types::*;

/// Look-ahead window scanning
mod scanner;
pub use scanner::*;

/// HTTP access to the schedule pages
mod schedule_client;
pub use schedule_client::*;

/// HTML schedule parsing
mod schedule_parser;
pub use schedule_parser::*;

/// Persisted availability state
mod state_store;
pub use state_store::*;

/// Error-rate watchdog
mod watchdog;
pub use watchdog::*;
