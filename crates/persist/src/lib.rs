//! Persistence: region files holding chunk columns for one dimension of a world.
//!
//! # Invariants
//! - Dimensions of one world share a base path; secondary dimensions live in
//!   their own sub-directory (`DIM-1`, `DIM1`).
//! - Region files are content-hashed; a file whose hash disagrees with the
//!   manifest is never decoded.
//! - Nothing is written until the first flush.

mod store;

pub use store::{IntegrityManifest, ManifestEntry, REGION_WIDTH, RegionMeta, RegionStore, StoreError};
