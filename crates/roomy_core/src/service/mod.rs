//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into account, bootstrap and directory APIs.
//! - Keep CLI callers decoupled from storage details.

pub mod account_service;
pub mod bootstrap;
pub mod directory;
pub mod helpers;
