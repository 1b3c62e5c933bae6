//! Blob Store
//!
//! Content-addressed files under the public upload directory. Writes go to
//! a temporary file in the same directory and are renamed into place, so a
//! concurrent reader sees either the previous file or the complete new one.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use super::hasher::{ContentDigest, ContentHasher};

const READ_BUF_SIZE: usize = 64 * 1024;

/// Result of a successful store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    /// The target existed before this write (same content, same name)
    pub replaced: bool,
}

/// Filesystem blob store rooted at the upload directory
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if needed. Called once at startup.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Open a temporary file for content whose name is not known yet.
    ///
    /// Fails if the directory is missing or unwritable.
    pub async fn begin(&self) -> io::Result<PendingBlob> {
        let temp = self.dir.join(format!(".{}.part", Uuid::new_v4()));
        let file = fs::File::create(&temp).await?;

        Ok(PendingBlob {
            dir: self.dir.clone(),
            temp,
            file,
            hasher: ContentHasher::new(),
            size: 0,
            committed: false,
        })
    }

    /// Write the whole of `reader` to `<dir>/<filename>`.
    ///
    /// The reader must already be positioned at the start of the content.
    /// Fails if the directory is missing or unwritable; nothing is left
    /// behind on failure.
    pub async fn store<R>(&self, reader: &mut R, filename: &str) -> io::Result<StoredBlob>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut pending = self.begin().await?;
        let mut buf = vec![0u8; READ_BUF_SIZE];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            pending.write(&buf[..n]).await?;
        }

        pending.commit(filename).await
    }

    pub async fn exists(&self, filename: &str) -> io::Result<bool> {
        fs::try_exists(self.path_for(filename)).await
    }
}

/// Content being written to a temporary file, hashed as it arrives.
///
/// Dropping it without [`commit`](Self::commit) removes the temporary file.
#[derive(Debug)]
pub struct PendingBlob {
    dir: PathBuf,
    temp: PathBuf,
    file: fs::File,
    hasher: ContentHasher,
    size: u64,
    committed: bool,
}

impl PendingBlob {
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.hasher.update(chunk);
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Digest of the bytes written so far
    pub fn digest(&self) -> ContentDigest {
        self.hasher.clone().finish()
    }

    /// Sync the content and rename it to `<dir>/<filename>`
    pub async fn commit(mut self, filename: &str) -> io::Result<StoredBlob> {
        self.file.flush().await?;
        self.file.sync_all().await?;

        let target = self.dir.join(filename);
        let replaced = match fs::try_exists(&target).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!(file = %filename, error = %e, "Could not check for existing blob");
                false
            }
        };

        fs::rename(&self.temp, &target).await?;
        self.committed = true;

        tracing::debug!(
            file = %filename,
            bytes = self.size,
            replaced,
            "Blob stored"
        );

        Ok(StoredBlob {
            filename: filename.to_string(),
            path: target,
            size: self.size,
            replaced,
        })
    }
}

impl Drop for PendingBlob {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.temp) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.temp.display(), error = %e, "Failed to remove temporary upload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::digest_bytes;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn entry_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_store_writes_full_contents() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("upload"));
        store.ensure_dir().await.unwrap();

        let mut reader = Cursor::new(b"hello blob".to_vec());
        let stored = store.store(&mut reader, "abc.txt").await.unwrap();

        assert_eq!(stored.size, 10);
        assert!(!stored.replaced);
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"hello blob");
        assert!(store.exists("abc.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_same_content_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        store.store(&mut Cursor::new(b"same".to_vec()), "h.png").await.unwrap();
        let second = store.store(&mut Cursor::new(b"same".to_vec()), "h.png").await.unwrap();

        assert!(second.replaced);
        assert_eq!(std::fs::read(store.path_for("h.png")).unwrap(), b"same");

        // No temporary files left behind
        assert_eq!(entry_count(temp_dir.path()), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("not-created"));

        let result = store.store(&mut Cursor::new(b"x".to_vec()), "a.png").await;
        assert!(result.is_err());
        assert!(!store.exists("a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        let stored = store.store(&mut Cursor::new(Vec::new()), "e.bin").await.unwrap();
        assert_eq!(stored.size, 0);
        assert!(store.exists("e.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_blob_hashes_while_writing() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        let mut pending = store.begin().await.unwrap();
        pending.write(b"hello ").await.unwrap();
        pending.write(b"blob").await.unwrap();

        assert_eq!(pending.size(), 10);
        let digest = pending.digest();
        assert_eq!(digest, digest_bytes(b"hello blob"));

        let name = format!("{}.txt", digest);
        let stored = pending.commit(&name).await.unwrap();
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"hello blob");
        assert_eq!(entry_count(temp_dir.path()), 1);
    }

    #[tokio::test]
    async fn test_abandoned_pending_blob_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        let mut pending = store.begin().await.unwrap();
        pending.write(b"partial").await.unwrap();
        assert_eq!(entry_count(temp_dir.path()), 1);

        drop(pending);
        assert_eq!(entry_count(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_exists_reports_io_errors() {
        let temp_dir = TempDir::new().unwrap();
        let not_a_dir = temp_dir.path().join("upload");
        std::fs::write(&not_a_dir, b"file").unwrap();

        let store = BlobStore::new(&not_a_dir);
        assert!(store.exists("a.png").await.is_err());
    }
}
