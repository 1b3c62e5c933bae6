//! Upload Module
//!
//! Content-addressed storage of uploaded files:
//! - SHA-1 content hashing
//! - `<hash>.<ext>` naming
//! - Atomic writes into the public upload directory
//!
//! Flow:
//! 1. The upload field is located and its extension validated
//! 2. Chunks stream into a temporary file under an idle read deadline,
//!    hashed as they are written
//! 3. The temporary file is renamed to `<hash>.<ext>`

pub mod blob_store;
pub mod hasher;
pub mod naming;

use std::time::Duration;

use axum::extract::multipart::Field;
use axum::extract::Multipart;

use crate::error::{AppError, Result};

pub use blob_store::{BlobStore, PendingBlob, StoredBlob};
pub use hasher::{digest_bytes, digest_reader, ContentDigest, ContentHasher};
pub use naming::{is_storage_filename, storage_filename};

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "nf";

/// Find the upload field and stream it into the blob store.
///
/// Other fields are skipped. Every read from the request body, including
/// the search for the next field, must complete within `idle_timeout`.
/// A failed or stalled upload leaves nothing in the store.
pub async fn receive_upload(
    multipart: &mut Multipart,
    store: &BlobStore,
    idle_timeout: Duration,
) -> Result<StoredBlob> {
    loop {
        let field = tokio::time::timeout(idle_timeout, multipart.next_field())
            .await
            .map_err(|_| AppError::UploadTimeout(idle_timeout.as_secs()))?
            .map_err(|e| AppError::FormParse(format!("Failed to read multipart field: {}", e)))?;

        let Some(field) = field else {
            return Err(AppError::FormParse(format!(
                "No file provided. Use field name '{}'",
                UPLOAD_FIELD
            )));
        };

        let name = field.name().unwrap_or("").to_string();
        tracing::debug!(field = %name, file_name = ?field.file_name(), "Received form field");

        if name != UPLOAD_FIELD {
            continue;
        }

        let original = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::FormParse(format!("Field '{}' is not a file", UPLOAD_FIELD)))?;

        let stored = stream_field(field, store, &original, idle_timeout).await?;

        tracing::info!(
            original = %original,
            file = %stored.filename,
            bytes = stored.size,
            duplicate = stored.replaced,
            "Upload stored"
        );

        return Ok(stored);
    }
}

async fn stream_field(
    mut field: Field<'_>,
    store: &BlobStore,
    original: &str,
    idle_timeout: Duration,
) -> Result<StoredBlob> {
    // Reject bad names before touching the disk
    let ext = naming::extension(original)?;
    let mut pending = store.begin().await?;

    loop {
        let chunk = tokio::time::timeout(idle_timeout, field.chunk())
            .await
            .map_err(|_| AppError::UploadTimeout(idle_timeout.as_secs()))?
            .map_err(|e| AppError::FormParse(format!("Failed to read file data: {}", e)))?;

        match chunk {
            Some(bytes) => pending.write(&bytes).await?,
            None => break,
        }
    }

    let filename = naming::compose(&pending.digest(), ext);
    Ok(pending.commit(&filename).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};
    use futures::StreamExt;
    use tempfile::TempDir;

    const BOUNDARY: &str = "upload-unit-boundary";

    fn form_part(field: &str, file_name: Option<&str>, content: &[u8]) -> Vec<u8> {
        let mut part = format!("--{}\r\nContent-Disposition: form-data; name=\"{}\"", BOUNDARY, field);
        if let Some(file_name) = file_name {
            part.push_str(&format!("; filename=\"{}\"", file_name));
        }
        part.push_str("\r\n\r\n");

        let mut bytes = part.into_bytes();
        bytes.extend_from_slice(content);
        bytes.extend_from_slice(b"\r\n");
        bytes
    }

    fn close(mut body: Vec<u8>) -> Vec<u8> {
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn multipart(body: Body) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body)
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn entry_count(store: &BlobStore) -> usize {
        std::fs::read_dir(store.dir()).unwrap().count()
    }

    #[tokio::test]
    async fn test_receive_names_by_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        let mut body = form_part("caption", None, b"ignored");
        body.extend(form_part(UPLOAD_FIELD, Some("photo.png"), b"X"));
        let mut form = multipart(Body::from(close(body))).await;

        let stored = receive_upload(&mut form, &store, Duration::from_secs(5)).await.unwrap();

        assert_eq!(stored.filename, format!("{}.png", digest_bytes(b"X")));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"X");
        assert_eq!(entry_count(&store), 1);
    }

    #[tokio::test]
    async fn test_receive_rejects_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        let body = close(form_part(UPLOAD_FIELD, Some("Makefile"), b"all:"));
        let mut form = multipart(Body::from(body)).await;

        let result = receive_upload(&mut form, &store, Duration::from_secs(5)).await;

        assert!(matches!(result, Err(AppError::InvalidFilename(_))));
        assert_eq!(entry_count(&store), 0);
    }

    #[tokio::test]
    async fn test_receive_without_upload_field() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        let body = close(form_part("other", Some("photo.png"), b"X"));
        let mut form = multipart(Body::from(body)).await;

        let result = receive_upload(&mut form, &store, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(AppError::FormParse(_))));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out_and_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path());

        // Headers and part of the content, then the client goes quiet
        let head = form_part(UPLOAD_FIELD, Some("photo.png"), b"partial");
        let head = head[..head.len() - 2].to_vec();
        let stream = futures::stream::iter(vec![Ok::<_, std::io::Error>(head)])
            .chain(futures::stream::pending());
        let mut form = multipart(Body::from_stream(stream)).await;

        let result = receive_upload(&mut form, &store, Duration::from_millis(100)).await;

        assert!(matches!(result, Err(AppError::UploadTimeout(_))));
        assert_eq!(entry_count(&store), 0);
    }
}
