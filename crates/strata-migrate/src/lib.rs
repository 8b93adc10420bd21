//! Strata Migrate
//!
//! Ordered, one-version-at-a-time upgrades of a data tree.
//!
//! # Core Concepts
//!
//! - [`Migration`]: a pure transform from schema version `N` to `N + 1`
//! - [`FnMigration`]: adapter turning a closure into a [`Migration`]
//! - [`MigrationRegistry`]: steps keyed by the version they upgrade *from*
//! - [`PartialMigration`]: a chain that stopped early, carrying the best tree
//!   reached so far
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_migrate::{FnMigration, MigrationRegistry, transform};
//!
//! let mut registry = MigrationRegistry::new();
//! registry.register(0, FnMigration::new("rename products to catalog", |tree, _| {
//!     let mut tree = tree.clone();
//!     transform::rename_key(&mut tree, "products", "catalog");
//!     Ok(tree)
//! }))?;
//!
//! let migrated = registry.run(stored, 0)?;
//! assert_eq!(migrated.reached, registry.current_version());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod migration;
mod registry;
pub mod transform;

pub use error::{MigrationError, PartialMigration};
pub use migration::{FnMigration, Migration};
pub use registry::{Migrated, MigrationRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
