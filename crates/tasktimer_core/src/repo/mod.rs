//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable task store contract.
//! - Isolate SQLite query details from registry/session orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Read paths reject invalid persisted rows instead of masking them.

pub mod task_repo;
