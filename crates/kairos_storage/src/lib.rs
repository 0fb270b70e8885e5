//! # Kairos Storage
//!
//! Byte-level storage for the Kairos event store.
//!
//! Backends are **opaque append-only byte stores**. They know nothing about
//! journal records, events or versions; `kairos_core` owns every format
//! decision and only asks a backend to read, append, flush and truncate.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral storage for tests and scratch databases
//! - [`FileBackend`] - persistent storage on a single file
//!
//! ## Example
//!
//! ```rust
//! use kairos_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"journal bytes").unwrap();
//! assert_eq!(backend.read_at(offset, 7).unwrap(), b"journal");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
