//! JSON document helpers shared by the file-backed stores.

use nimbus_error::{JsonError, NimbusResult, StorageError, StorageErrorKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and decode a JSON document, returning `None` when the file is missing.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> NimbusResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into());
        }
    };

    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        StorageError::new(StorageErrorKind::Corrupt(format!("{}: {}", path.display(), e))).into()
    })
}

/// Encode a document and write it through a temp file + rename.
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> NimbusResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| JsonError::new(format!("{}: {}", path.display(), e)))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            temp_path.display(),
            e
        )))
    })?;

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        )))
    })?;

    Ok(())
}

/// Make an arbitrary identifier safe to use as a single path segment.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes `%XX`.
pub(crate) fn encode_segment(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    if encoded.is_empty() {
        encoded.push('%');
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_segment_escapes_separators() {
        assert_eq!(encode_segment("user-42_a"), "user-42_a");
        assert_eq!(encode_segment("../etc"), "%2E%2E%2Fetc");
        assert_eq!(encode_segment("a@b.c"), "a%40b%2Ec");
        assert_eq!(encode_segment(""), "%");
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let value: Option<Vec<u32>> = read_json(&dir.path().join("absent.json")).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn write_then_read_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/doc.json");
        write_json_atomic(&path, &vec![1u32, 2, 3]).await.unwrap();

        let value: Option<Vec<u32>> = read_json(&path).await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
        assert!(!path.with_extension("tmp").exists());
    }
}
