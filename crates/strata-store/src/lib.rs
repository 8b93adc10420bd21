//! Strata Store
//!
//! Persistence primitives for a single versioned data tree:
//! - [`EnvelopeCodec`]: wraps/unwraps the `{version, data}` envelope and
//!   recognises the legacy bare-tree layout
//! - [`KeyValueStore`]: the synchronous store seam
//! - [`MemoryStore`]: in-process store (tests, embedding)
//! - [`FileStore`]: one file per key with atomic replacement
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_store::{EnvelopeCodec, KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let codec = EnvelopeCodec::new();
//!
//! let raw = codec.encode(&serde_json::json!({"items": []}), 3)?;
//! store.set("app-state", &raw)?;
//!
//! let decoded = codec.decode(store.get("app-state")?.as_deref())?;
//! assert_eq!(decoded.version, 3);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod envelope;
mod error;
mod file;
mod store;

pub use envelope::{empty_tree, Decoded, EnvelopeCodec, EnvelopeFormat};
pub use error::{DecodeError, EncodeError, StoreError};
pub use file::FileStore;
pub use store::{KeyValueStore, MemoryStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
