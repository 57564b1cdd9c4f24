//! Core use-case services.
//!
//! # Responsibility
//! - Own the in-memory task registry that mirrors the store.
//! - Expose the UI-shell facade that coordinates registry, session and
//!   daily reset.
//!
//! # Invariants
//! - The store is only reachable through the registry lock.
//! - At most one timer session is live per facade.

pub mod error;
pub mod registry;
pub mod timer_service;
