//! Strata Core
//!
//! The persistence controller that keeps one versioned data tree:
//! - Loads it from a [`KeyValueStore`](strata_store::KeyValueStore)
//! - Brings it to the current schema through ordered migrations
//! - Reconciles it against a compiled-in [`Baseline`] so new built-in
//!   content appears without losing user edits
//! - Saves every mutation back, degrading instead of failing
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::{Baseline, ControllerConfig, PersistenceController};
//! use strata_merge::{MergePolicy, PolicyTable};
//! use strata_migrate::MigrationRegistry;
//! use strata_store::MemoryStore;
//!
//! let baseline = Baseline::from_json_str(include_str!("baseline.json"))?;
//! let policies = PolicyTable::new().with("catalog", MergePolicy::collection_by_id("id"))?;
//!
//! let mut controller = PersistenceController::open(
//!     MemoryStore::new(),
//!     baseline,
//!     policies,
//!     MigrationRegistry::new(),
//!     ControllerConfig::default(),
//! )?;
//!
//! controller.mutate(|tree| {
//!     let mut next = tree.clone();
//!     next["currency"] = "EUR".into();
//!     next
//! });
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod baseline;
mod config;
mod controller;
mod error;
mod fingerprint;
mod live;

pub use baseline::Baseline;
pub use config::{ControllerConfig, DEFAULT_STORAGE_KEY};
pub use controller::PersistenceController;
pub use error::{ConfigError, ControllerError};
pub use fingerprint::Fingerprint;
pub use live::{ControllerPhase, LiveState, LoadReport, RefreshOutcome, SaveStatus};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
