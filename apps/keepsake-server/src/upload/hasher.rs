//! Content Hasher
//!
//! SHA-1 digests of uploaded bytes. The digest is the content address used
//! to name stored blobs.

use std::fmt;
use std::io;

use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt};

/// SHA-1 digest length in bytes
pub const DIGEST_LEN: usize = 20;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Fixed-length digest of a byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Lowercase hex, 40 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

}

/// Incremental digest over chunks fed in order
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha1,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    pub fn finish(self) -> ContentDigest {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&self.inner.finalize());
        ContentDigest(bytes)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash a stream from its current position to EOF.
///
/// The stream is left at its end; callers that need the bytes again must
/// rewind it first.
pub async fn digest_reader<R>(reader: &mut R) -> io::Result<ContentDigest>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finish())
}

/// Hash an in-memory buffer
pub fn digest_bytes(data: &[u8]) -> ContentDigest {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_empty_stream_hashes_zero_bytes() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        let digest = digest_reader(&mut reader).await.unwrap();
        assert_eq!(digest.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[tokio::test]
    async fn test_known_vector() {
        let mut reader = Cursor::new(b"abc".to_vec());
        let digest = digest_reader(&mut reader).await.unwrap();
        assert_eq!(digest.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(digest, digest_bytes(b"abc"));
    }

    #[tokio::test]
    async fn test_reads_from_current_position() {
        let mut reader = Cursor::new(b"skip-abc".to_vec());
        reader.set_position(5);
        let digest = digest_reader(&mut reader).await.unwrap();
        assert_eq!(digest, digest_bytes(b"abc"));
        assert_eq!(reader.position(), 8);
    }

    #[tokio::test]
    async fn test_stream_larger_than_buffer() {
        let data: Vec<u8> = (0..(READ_BUF_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let mut reader = Cursor::new(data.clone());
        let digest = digest_reader(&mut reader).await.unwrap();
        assert_eq!(digest, digest_bytes(&data));
    }

    #[test]
    fn test_chunked_updates_match_whole_input() {
        let mut hasher = ContentHasher::new();
        for chunk in [&b"ab"[..], b"", b"c"] {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finish(), digest_bytes(b"abc"));
    }

    #[test]
    fn test_distinct_content_distinct_digest() {
        assert_ne!(digest_bytes(b"X"), digest_bytes(b"Y"));
        assert_eq!(digest_bytes(b"X").to_hex().len(), DIGEST_LEN * 2);
    }
}
