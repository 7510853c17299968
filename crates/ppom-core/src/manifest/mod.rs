//! Remote manifest sync and data file download.
//!
//! The CDN publishes `ppom_version.json`, a JSON array of
//! [`FileDescriptor`](crate::types::FileDescriptor)s, next to the data files
//! it lists. Sync is conditional:
//!
//! ```text
//! HEAD ppom_version.json ──ETag == cached?──► yes: Unchanged, no GET
//!                                   │
//!                                   no ──► GET ppom_version.json
//!                                           └─► sync_metadata ─► store manifest + ETag
//!                                                               └─► backlog for tracked chains
//! ```
//!
//! Data files are fetched from `<cdn>/<filePath>` and must carry a valid
//! Ed25519 signature before they reach [`VerifiedStorage`](crate::storage::VerifiedStorage),
//! which then applies the checksum gate.

pub mod errors;
pub mod fetcher;
pub mod sync;

pub use errors::ManifestError;
pub use fetcher::{FetchError, FetchResponse, Fetcher, HttpFetcher, HttpFetcherConfig};
pub use sync::{ManifestFetch, ManifestSync, SyncOutcome};
