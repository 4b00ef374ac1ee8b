//! Store layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the collaborative store contract used by services.
//! - Isolate SQLite query details from account/bootstrap orchestration.
//!
//! # Invariants
//! - Store writes validate schema types before persistence.
//! - Store APIs return semantic errors (`NotFound`, `KindMismatch`) in
//!   addition to DB transport errors.

pub mod co_store;
pub mod sqlite_store;
