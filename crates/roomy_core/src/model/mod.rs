//! Schema types for accounts, profiles, lists and inbox items.
//!
//! # Responsibility
//! - Declare the typed shapes stored in the collaborative store.
//! - Validate field constraints before anything reaches storage.
//!
//! # Invariants
//! - Every stored object is identified by a `CoId`.
//! - Enumerated fields (`InboxItemType`, `Role`) reject unknown strings.

pub mod account;
pub mod covalue;
pub mod group;
pub mod inbox;
pub mod validation;
