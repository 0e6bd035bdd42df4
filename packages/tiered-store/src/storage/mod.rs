// Storage backend trait and implementations

pub mod config;
pub mod filesystem;

#[cfg(test)]
pub(crate) mod conformance;

pub use config::StorageConfig;
pub use filesystem::FileSystemStorage;

use crate::error::StorageResult;
use crate::key::ObjectKey;
use async_trait::async_trait;
use tokio::io::AsyncRead;

/// Readable source handed back by fetches
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// Key-addressed object storage
///
/// Every medium gets one implementation of this trait. Callers only depend on
/// the contract below, which the shared conformance suite checks.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Typed configuration consumed by [`StorageBackend::configure`]
    type Config: Send;

    /// Validate `config` and produce a ready backend
    ///
    /// Fails with `InvalidConfiguration` before anything becomes usable.
    fn configure(config: Self::Config) -> StorageResult<Self>
    where
        Self: Sized;

    /// Drain `source` and store it under `key`, replacing any prior object
    ///
    /// Returns the number of bytes stored. When `expected_len` is given and
    /// the source yields a different amount, fails with `LengthMismatch` and
    /// leaves the previous object in place.
    async fn upload(
        &self,
        key: &ObjectKey,
        source: &mut (dyn AsyncRead + Send + Unpin),
        expected_len: Option<u64>,
    ) -> StorageResult<u64>;

    /// Open the whole object, or fail with `KeyNotFound`
    async fn fetch(&self, key: &ObjectKey) -> StorageResult<ByteSource>;

    /// Open `[start, end)` of the object
    ///
    /// `end` past the object's length is clamped. `end < start` or `start`
    /// past the length fails with `InvalidRange`.
    async fn fetch_range(&self, key: &ObjectKey, start: u64, end: u64) -> StorageResult<ByteSource>;

    /// Remove the object if present; missing keys are not an error
    async fn delete(&self, key: &ObjectKey) -> StorageResult<()>;

    /// Delete every key in order, stopping at the first failure
    async fn delete_all(&self, keys: &[ObjectKey]) -> StorageResult<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}
