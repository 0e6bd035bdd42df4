// Local filesystem storage backend
use super::{ByteSource, StorageBackend, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::io_utils;
use crate::key::ObjectKey;
use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

/// How often upload re-creates directories a concurrent delete just removed
const DIR_CREATE_ATTEMPTS: usize = 5;

/// Filesystem storage backend
///
/// Stores each object as one regular file at `root/<key path>`:
/// `topic/0/segment.log` lives at `{root}/topic/0/segment.log`.
///
/// Uploads land in a temporary file next to the target and are renamed into
/// place, so readers only ever see whole objects. Deletes prune directories
/// left empty, up to but never including the root.
#[derive(Debug)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    /// Configure a storage rooted at `root`
    pub fn with_root<P: AsRef<Path>>(root: P) -> StorageResult<Self> {
        Self::configure(StorageConfig::new(root))
    }

    /// Get the root directory for storage
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a key to its storage path
    fn key_to_path(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(key.to_relative_path())
    }

    /// Root must be an existing directory we can create files in
    fn validate_root(root: &Path) -> StorageResult<()> {
        let reject = || {
            StorageError::InvalidConfiguration(format!(
                "{} must be a writable directory",
                root.display()
            ))
        };

        let metadata = std::fs::metadata(root).map_err(|_| reject())?;
        if !metadata.is_dir() {
            return Err(reject());
        }

        // Writability is probed, not read from permission bits
        let probe = root.join(format!(".tstore-probe-{}", Uuid::new_v4()));
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)
            .map_err(|_| reject())?;
        std::fs::remove_file(&probe).map_err(|_| reject())?;

        Ok(())
    }

    /// Create the temporary file an upload streams into
    ///
    /// A concurrent delete may remove the target's directories between
    /// `create_dir_all` and the file creation; that case is retried.
    async fn create_temp_file(&self, key: &ObjectKey, path: &Path) -> StorageResult<(PathBuf, File)> {
        let parent = path.parent().unwrap_or(&self.root);
        let tmp_path = parent.join(format!(".{}.{}.tmp", key.name(), Uuid::new_v4()));

        let mut attempt = 1;
        loop {
            let created = match fs::create_dir_all(parent).await {
                Ok(()) => {
                    OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .open(&tmp_path)
                        .await
                }
                Err(e) => Err(e),
            };

            match created {
                Ok(file) => return Ok((tmp_path, file)),
                Err(e) if e.kind() == io::ErrorKind::NotFound && attempt < DIR_CREATE_ATTEMPTS => {
                    tracing::debug!(
                        %key,
                        dir = %parent.display(),
                        attempt,
                        "Directory vanished during upload, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Stream the source into `file`, then rename it over `path`
    async fn persist(
        mut file: File,
        source: &mut (dyn AsyncRead + Send + Unpin),
        tmp_path: &Path,
        path: &Path,
        expected_len: Option<u64>,
    ) -> StorageResult<u64> {
        let written = match io_utils::copy_all(source, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                // Writes still in flight would keep the file open past removal
                if let Err(flush) = file.flush().await {
                    tracing::debug!("Could not settle {}: {}", tmp_path.display(), flush);
                }
                return Err(e);
            }
        };

        if let Some(expected) = expected_len {
            if expected != written {
                return Err(StorageError::LengthMismatch {
                    expected,
                    actual: written,
                });
            }
        }

        file.sync_all().await?;
        drop(file);

        fs::rename(tmp_path, path).await?;
        Ok(written)
    }

    /// Open the object's file, returning it with its length
    async fn open_object(&self, key: &ObjectKey) -> StorageResult<(File, u64)> {
        let path = self.key_to_path(key);

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if is_absent(&e) => return Err(StorageError::KeyNotFound(key.clone())),
            Err(e) => return Err(e.into()),
        };

        // A directory at the key path is a prefix of other keys, not an object
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::KeyNotFound(key.clone()));
        }

        Ok((file, metadata.len()))
    }

    /// Remove directories the object at `path` leaves empty
    ///
    /// Walks upward at most one level per key component above the object,
    /// so the root itself is never a candidate. `remove_dir` refuses
    /// non-empty directories and symlinks, and any refusal ends the walk:
    /// the directory is in use, already gone, or not ours to remove.
    async fn remove_empty_ancestors(&self, key: &ObjectKey, path: &Path) {
        let mut dir = path.parent();

        for _ in 1..key.depth() {
            let Some(current) = dir else { break };
            if current == self.root.as_path() {
                break;
            }

            if let Err(e) = fs::remove_dir(current).await {
                tracing::trace!("Stopped cleanup at {}: {}", current.display(), e);
                break;
            }

            tracing::debug!("Removed empty directory: {}", current.display());
            dir = current.parent();
        }
    }
}

/// Errors meaning nothing is stored at the path
fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[async_trait]
impl StorageBackend for FileSystemStorage {
    type Config = StorageConfig;

    fn configure(config: StorageConfig) -> StorageResult<Self> {
        Self::validate_root(&config.root)?;

        tracing::info!("Configured filesystem storage at {}", config.root.display());

        Ok(Self { root: config.root })
    }

    async fn upload(
        &self,
        key: &ObjectKey,
        source: &mut (dyn AsyncRead + Send + Unpin),
        expected_len: Option<u64>,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(key);
        let (tmp_path, file) = self.create_temp_file(key, &path).await?;

        match Self::persist(file, source, &tmp_path, &path, expected_len).await {
            Ok(written) => {
                tracing::info!(%key, bytes = written, "Stored object");
                Ok(written)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                    tracing::debug!(
                        "Could not remove temporary file {}: {}",
                        tmp_path.display(),
                        cleanup
                    );
                }
                self.remove_empty_ancestors(key, &path).await;
                tracing::debug!(%key, error = %e, "Upload failed");
                Err(e)
            }
        }
    }

    async fn fetch(&self, key: &ObjectKey) -> StorageResult<ByteSource> {
        let (file, size) = self.open_object(key).await?;
        tracing::debug!(%key, bytes = size, "Fetching object");
        Ok(Box::new(file))
    }

    async fn fetch_range(&self, key: &ObjectKey, start: u64, end: u64) -> StorageResult<ByteSource> {
        let (mut file, size) = self.open_object(key).await?;

        if end < start || start > size {
            return Err(StorageError::InvalidRange { start, end, size });
        }

        let end = end.min(size);
        file.seek(SeekFrom::Start(start)).await?;

        tracing::debug!(%key, start, end, "Fetching object range");
        Ok(Box::new(file.take(end - start)))
    }

    async fn delete(&self, key: &ObjectKey) -> StorageResult<()> {
        let path = self.key_to_path(key);

        match fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                tracing::debug!(%key, "Key names a directory, nothing to delete");
            }
            Ok(_) => match fs::remove_file(&path).await {
                Ok(()) => tracing::info!(%key, "Deleted object"),
                Err(e) if is_absent(&e) => tracing::debug!(%key, "Object already gone"),
                Err(e) => return Err(e.into()),
            },
            Err(e) if is_absent(&e) => tracing::debug!(%key, "Object already gone"),
            Err(e) => return Err(e.into()),
        }

        self.remove_empty_ancestors(key, &path).await;
        Ok(())
    }
}
