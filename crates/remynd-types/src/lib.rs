//! Shared domain types for Remynd.
//!
//! This crate contains the core domain types used across the Remynd service:
//! Reminder, ReminderSpec, Frequency, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod reminder;
