//! Atomic TOML documents.
//!
//! Each document lives in its own file. Writes go through a temporary file,
//! fsync and rename; read-modify-write cycles hold an exclusive lock on a
//! sibling `.lock` file.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure modes of a locked TOML read or write.
#[derive(Debug, Error)]
pub enum AtomicTomlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Lock error: {0}")]
    Lock(String),
    /// `create` found an existing document
    #[error("Document already exists: {0}")]
    AlreadyExists(PathBuf),
    /// `modify` found no document
    #[error("Document not found: {0}")]
    Missing(PathBuf),
    /// Rejected by the caller's update closure
    #[error("{0}")]
    Rejected(String),
}

/// A handle to one TOML document on disk.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document. A missing or empty file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(toml::from_str(&content)?))
    }

    /// Writes the document with tmp file + fsync + rename.
    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let encoded = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut staging = File::create(&tmp_path)?;
        staging.write_all(encoded.as_bytes())?;
        staging.sync_all()?;
        drop(staging);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Writes a new document, failing if one already exists.
    pub fn create(&self, data: &T) -> Result<(), AtomicTomlError> {
        let _lock = FileLock::acquire(&self.path)?;
        if self.path.exists() {
            return Err(AtomicTomlError::AlreadyExists(self.path.clone()));
        }
        self.save(data)
    }

    /// Locked read-modify-write of an existing document.
    ///
    /// The closure's return value is handed back once the document is saved.
    /// If the closure fails nothing is written.
    pub fn modify<R, F>(&self, f: F) -> Result<R, AtomicTomlError>
    where
        F: FnOnce(&mut T) -> Result<R, AtomicTomlError>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self
            .load()?
            .ok_or_else(|| AtomicTomlError::Missing(self.path.clone()))?;
        let result = f(&mut data)?;
        self.save(&data)?;

        Ok(result)
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicTomlError> {
        let invalid = |what: &str| {
            AtomicTomlError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Path has no {}", what),
            ))
        };
        let parent = self.path.parent().ok_or_else(|| invalid("parent directory"))?;
        let file_name = self.path.file_name().ok_or_else(|| invalid("file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock on `<document>.lock`, released on drop.
///
/// The lock file itself is left in place; deleting it would let a second
/// writer lock a fresh inode while the first still holds the old one.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicTomlError::Lock(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        count: u32,
    }

    fn counter() -> Counter {
        Counter {
            name: "guesses".to_string(),
            count: 0,
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("missing.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("c.toml"));

        file.create(&counter()).unwrap();
        let err = file.create(&counter()).unwrap_err();
        assert!(matches!(err, AtomicTomlError::AlreadyExists(_)));
    }

    #[test]
    fn test_modify_returns_closure_result() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("c.toml"));
        file.create(&counter()).unwrap();

        let after = file
            .modify(|c| {
                c.count += 3;
                Ok(c.count)
            })
            .unwrap();
        assert_eq!(after, 3);
        assert_eq!(file.load().unwrap().unwrap().count, 3);
    }

    #[test]
    fn test_modify_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("nope.toml"));
        let err = file.modify(|_| Ok(())).unwrap_err();
        assert!(matches!(err, AtomicTomlError::Missing(_)));
    }

    #[test]
    fn test_rejected_modify_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("c.toml"));
        file.create(&counter()).unwrap();

        let result: Result<(), _> = file.modify(|c| {
            c.count = 99;
            Err(AtomicTomlError::Rejected("no".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(file.load().unwrap().unwrap().count, 0);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("c.toml");
        let file = AtomicTomlFile::<Counter>::new(path.clone());
        file.save(&counter()).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".c.toml.tmp").exists());
    }
}
