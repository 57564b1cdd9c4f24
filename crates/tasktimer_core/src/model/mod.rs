//! Task domain model.
//!
//! # Responsibility
//! - Define the task record shared by the store, registry and sessions.
//! - Validate creation input coming from the UI shell.
//!
//! # Invariants
//! - Every task is identified by a store-assigned `TaskId`.
//! - Names are display fields; identity is always the ID.

pub mod task;
