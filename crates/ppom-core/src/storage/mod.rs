//! Checksum-gated storage for PPOM data files.
//!
//! The storage backend itself is injected through [`StorageBackend`]; this
//! module adds the verification layer on top of it ([`VerifiedStorage`]) and
//! ships two backends:
//!
//! - [`InMemoryStorage`]: `DashMap`-backed, the default for embedding and tests
//! - [`FileSystemStorage`]: one file per key under a root directory
//!
//! # Checksum Gate
//!
//! ```text
//! write_file(data, checksum) ──digest(data) == checksum?──► backend.write ──► metadata upsert
//!                                       │ no
//!                                       └──► ChecksumMismatch (backend untouched)
//!
//! read_file(key) ──metadata?──► backend.read ──digest == metadata.checksum?──► bytes
//! ```

pub mod backend;
pub mod errors;
pub mod fs;
pub mod memory;
pub mod verified;

pub use backend::StorageBackend;
pub use errors::StorageError;
pub use fs::FileSystemStorage;
pub use memory::InMemoryStorage;
pub use verified::{MetadataReader, MetadataWriter, VerifiedStorage, WriteRequest};
