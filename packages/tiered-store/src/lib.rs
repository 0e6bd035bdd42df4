//! Key-addressed object storage for tiered segment storage.
//!
//! Callers address whole objects (segments, indexes, manifests) by an
//! [`ObjectKey`] and talk to any medium through the [`StorageBackend`]
//! trait. [`FileSystemStorage`] keeps objects as files under a root
//! directory; [`io_utils`] holds the short-read-tolerant stream helpers the
//! backends build on.

pub mod error;
pub mod io_utils;
pub mod key;
pub mod storage;

pub use error::{StorageError, StorageResult};
pub use key::ObjectKey;
pub use storage::{ByteSource, FileSystemStorage, StorageBackend, StorageConfig};
