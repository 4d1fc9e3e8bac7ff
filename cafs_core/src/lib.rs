//! Core types and traits shared by all cafs crates.
//!
//! - Content hashes ([`Hash`], BLAKE3-256)
//! - Raw byte storage backends ([`Store`], [`StoreFeatures`])
//! - The content-addressed blob layer ([`ContentStore`]) that deduplicates
//!   by hash and verifies integrity on every read

pub mod blob;
pub mod hash;
pub mod store;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

pub use blob::store::ContentStore;
pub use blob::{BlobError, BlobResult};
pub use hash::Hash;
pub use store::{Store, StoreError, StoreFeatures, StoreResult};
