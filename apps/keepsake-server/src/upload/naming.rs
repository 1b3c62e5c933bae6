//! Filename Builder
//!
//! Storage names are `<hex digest>.<extension>`. The extension is the
//! segment right after the first `.` of the client's file name, so
//! `archive.tar.gz` is stored as `<hash>.tar`.

use crate::error::{AppError, Result};

use super::hasher::ContentDigest;

/// Extract the storage extension from a client-supplied file name.
///
/// Any client directory prefix is dropped first.
pub fn extension(original: &str) -> Result<&str> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);

    let ext = base
        .split('.')
        .nth(1)
        .ok_or_else(|| AppError::InvalidFilename(original.to_string()))?;

    if ext.is_empty() || !ext.chars().all(is_extension_char) {
        return Err(AppError::InvalidFilename(original.to_string()));
    }

    Ok(ext)
}

/// Join a digest and an already-validated extension
pub fn compose(digest: &ContentDigest, ext: &str) -> String {
    format!("{}.{}", digest.to_hex(), ext)
}

/// Build the storage name for `original` with content `digest`
pub fn storage_filename(original: &str, digest: &ContentDigest) -> Result<String> {
    Ok(compose(digest, extension(original)?))
}

/// Whether `name` has the shape of a name produced by [`compose`]
pub fn is_storage_filename(name: &str) -> bool {
    match name.split_once('.') {
        Some((hash, ext)) => {
            hash.len() == super::hasher::DIGEST_LEN * 2
                && hash.chars().all(|c| c.is_ascii_hexdigit())
                && !ext.is_empty()
                && ext.chars().all(is_extension_char)
        }
        None => false,
    }
}

fn is_extension_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
