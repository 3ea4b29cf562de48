//! Blob storage for uploaded files.
//!
//! Blobs are stored under UUID names, sharded by the first two characters:
//! ```text
//! {base_path}/
//! ├── ab/
//! │   └── ab12cd34-5678-90ab-cdef-123456789012.txt
//! └── cd/
//!     └── cd90ab12-3456-7890-abcd-ef1234567890.bin
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{DriveError, Result};

/// Result of saving a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Name of the blob on disk.
    pub stored_name: String,
    /// Size in bytes.
    pub size: i64,
    /// Lowercase hex SHA-256 of the content.
    pub checksum: String,
}

/// Blob storage rooted at a base directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage, creating the base directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under a new UUID-based name.
    ///
    /// The extension of `original_name` is kept when it is short and
    /// alphanumeric; otherwise `bin` is used.
    pub fn save(&self, content: &[u8], original_name: &str) -> Result<StoredBlob> {
        let stored_name = Self::generate_stored_name(original_name);
        let file_path = self.get_file_path(&stored_name);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, content)?;

        Ok(StoredBlob {
            stored_name,
            size: content.len() as i64,
            checksum: checksum(content),
        })
    }

    /// Load a blob.
    pub fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        let file_path = self.get_file_path(stored_name);

        match fs::read(&file_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DriveError::NotFound(format!("blob {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `false` if the blob did not exist.
    pub fn delete(&self, stored_name: &str) -> Result<bool> {
        let file_path = self.get_file_path(stored_name);

        match fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists.
    pub fn exists(&self, stored_name: &str) -> bool {
        self.get_file_path(stored_name).exists()
    }

    /// Full path of a stored blob: `{base_path}/{shard}/{stored_name}`.
    pub fn get_file_path(&self, stored_name: &str) -> PathBuf {
        let shard = Self::get_shard(stored_name);
        self.base_path.join(shard).join(stored_name)
    }

    fn get_shard(stored_name: &str) -> &str {
        stored_name.get(..2).unwrap_or(stored_name)
    }

    fn extract_extension(filename: &str) -> String {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// Generate a new UUID-based stored name.
    pub fn generate_stored_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name);
        format!("{uuid}.{ext}")
    }
}

/// Lowercase hex SHA-256 of `content`.
pub fn checksum(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().join("blobs");
        assert!(!storage_path.exists());

        let storage = FileStorage::new(&storage_path).unwrap();
        assert!(storage_path.exists());
        assert_eq!(storage.base_path(), storage_path);
    }

    #[test]
    fn test_save_and_load() {
        let (_temp_dir, storage) = setup_storage();
        let blob = storage.save(b"Hello, World!", "hello.txt").unwrap();

        assert!(blob.stored_name.ends_with(".txt"));
        assert_eq!(blob.size, 13);
        assert_eq!(
            blob.checksum,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(storage.load(&blob.stored_name).unwrap(), b"Hello, World!");

        let shard_dir = storage.base_path().join(&blob.stored_name[..2]);
        assert!(shard_dir.is_dir());
    }

    #[test]
    fn test_load_not_found() {
        let (_temp_dir, storage) = setup_storage();
        let result = storage.load("nonexistent.txt");
        assert!(matches!(result, Err(DriveError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, storage) = setup_storage();
        let blob = storage.save(b"to delete", "delete.txt").unwrap();
        assert!(storage.exists(&blob.stored_name));

        assert!(storage.delete(&blob.stored_name).unwrap());
        assert!(!storage.exists(&blob.stored_name));
        assert!(!storage.delete(&blob.stored_name).unwrap());
    }

    #[test]
    fn test_get_file_path() {
        let (_temp_dir, storage) = setup_storage();
        let stored_name = "ab12cd34-5678-90ab-cdef-123456789012.txt";
        assert_eq!(
            storage.get_file_path(stored_name),
            storage.base_path().join("ab").join(stored_name)
        );
        assert_eq!(FileStorage::get_shard("x"), "x");
    }

    #[test]
    fn test_extract_extension() {
        assert_eq!(FileStorage::extract_extension("test.TXT"), "txt");
        assert_eq!(FileStorage::extract_extension("archive.tar.gz"), "gz");
        assert_eq!(FileStorage::extract_extension("no_ext"), "bin");
        assert_eq!(FileStorage::extract_extension(".hidden"), "bin");
        assert_eq!(FileStorage::extract_extension("weird.ex t"), "bin");
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
