//! Strata operator CLI
//!
//! Inspects and edits a quote-builder workspace persisted through a
//! [`strata_core::PersistenceController`].
//!
//! - `schema`: compiled-in baseline, merge policies and migrations
//! - `commands`: subcommand bodies, written against any output sink

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod schema;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
