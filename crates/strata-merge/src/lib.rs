//! Strata Merge
//!
//! Reconciles a user data tree against a compiled-in baseline so that new
//! built-in content shows up without discarding anything the user created
//! or edited.
//!
//! # Core Concepts
//!
//! - [`MergeStrategy`]: core trait, one implementation per policy
//! - [`OverrideStrategy`]: user value wins if present at all
//! - [`DeepMergeStrategy`]: baseline fills only what is missing, at any depth
//! - [`CollectionByIdStrategy`]: user records verbatim, new baseline records appended
//! - [`NestedMapStrategy`]: every baseline group present, flags shallow-merged
//! - [`ArrayGuardStrategy`]: critical arrays are never null
//! - [`PolicyTable`]: one declared [`MergePolicy`] per top-level field
//! - [`MergeEngine`]: dispatches each field to its declared policy
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_merge::{ArrayFallback, MergeEngine, MergePolicy, PolicyTable};
//!
//! let table = PolicyTable::new()
//!     .with("settings", MergePolicy::DeepMerge)?
//!     .with("catalog", MergePolicy::collection_by_id("id"))?
//!     .with("roles", MergePolicy::NestedMap)?
//!     .with("actors", MergePolicy::array_guard(ArrayFallback::Baseline))?;
//!
//! let engine = MergeEngine::new(table);
//! engine.validate_baseline(&baseline)?;
//! let live = engine.merge(&user, &baseline)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod collection;
mod deep;
mod engine;
mod guard;
mod nested_map;
mod policy;
mod replace;
mod strategy;
mod table;

pub use collection::CollectionByIdStrategy;
pub use deep::{deep_merge, DeepMergeStrategy};
pub use engine::MergeEngine;
pub use guard::ArrayGuardStrategy;
pub use nested_map::NestedMapStrategy;
pub use policy::{ArrayFallback, MergePolicy, ProtectedSubset};
pub use replace::OverrideStrategy;
pub use strategy::{value_kind, MergeError, MergeStrategy, Shape};
pub use table::{FieldRule, PolicyTable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
