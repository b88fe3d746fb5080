//! Photo file storage.
//!
//! Photos live in a flat content directory keyed by their generated filename.
//! Writes are atomic: data goes to a temp file that is renamed into place, so
//! a reader never sees a partially written photo.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use storefinder_core::{Error, Result};

/// Storage backend for photo files.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under `name`, replacing any existing file.
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Read the file stored under `name`.
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Delete the file stored under `name`. Missing files are not an error.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Check whether a file is stored under `name`.
    async fn exists(&self, name: &str) -> Result<bool>;
}

/// Filesystem backend rooted at one content directory.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a stored name to its path, refusing anything that is not a
    /// single plain file name.
    fn full_path(&self, name: &str) -> Result<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !plain {
            return Err(Error::Validation(format!("invalid photo filename {:?}", name)));
        }
        Ok(self.base_path.join(name))
    }

    /// Check that the content directory can be created, written, read and
    /// cleaned up. Intended for startup.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_file = self.base_path.join(".health-check");

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.base_path, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(name)?;
        debug!(
            subsystem = "storage",
            component = "filesystem",
            op = "write",
            photo = %name,
            size = data.len(),
            "Writing photo"
        );

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            warn!(dir = %self.base_path.display(), error = %e, "storage: create_dir_all failed");
            e
        })?;

        let temp_path = self.base_path.join(format!(".{}.tmp", name));
        if let Err(e) = write_and_rename(&temp_path, &full_path, data).await {
            warn!(
                subsystem = "storage",
                component = "filesystem",
                temp_path = %temp_path.display(),
                error = %e,
                "Atomic write failed, removing temp file"
            );
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.full_path(name)?).await?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let full_path = self.full_path(name)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(name)?).await?)
    }
}

/// Write `data` to `temp_path`, flush it to disk, then move it over `target`.
async fn write_and_rename(temp_path: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_delete() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("uploads"));

        backend.write("a.png", b"pixels").await.unwrap();
        assert!(backend.exists("a.png").await.unwrap());
        assert_eq!(backend.read("a.png").await.unwrap(), b"pixels");

        backend.delete("a.png").await.unwrap();
        assert!(!backend.exists("a.png").await.unwrap());
        backend.delete("a.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.write("b.jpeg", b"data").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.jpeg".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        // A directory in the way makes the final rename fail after the
        // temp file has been written and synced.
        std::fs::create_dir(dir.path().join("c.png")).unwrap();

        assert!(backend.write("c.png", b"data").await.is_err());

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["c.png".to_string()]);
        assert!(dir.path().join("c.png").is_dir());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        for name in ["../escape.png", "nested/x.png", "..", ""] {
            assert!(
                matches!(backend.write(name, b"x").await, Err(Error::Validation(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("fresh"));
        backend.validate().await.unwrap();
        assert!(!dir.path().join("fresh/.health-check").exists());
    }
}
