//! File-system capability the import writes through.
//!
//! The [`Vault`] trait is the full set of operations the pipeline needs from
//! the target note store: create a folder, create a text or binary file, delete
//! a file, and check whether a path exists. All paths are relative to the vault
//! root.
//!
//! Creating a file never overwrites. Callers that want to replace a file delete
//! it first, so every write in the pipeline is delete-then-create. That pattern
//! is not atomic, which is why the importer performs one operation at a time
//! and assumes a single import per destination.
//!
//! The production implementation is [`DiskVault`], rooted at a directory on the
//! local file system.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl VaultError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == ErrorKind::AlreadyExists {
            Self::AlreadyExists(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Operations the importer performs on the target store.
pub trait Vault {
    /// Create a folder (and any missing parents). Fails with
    /// [`VaultError::AlreadyExists`] if it is already there.
    fn create_folder(&self, path: &Path) -> Result<(), VaultError>;

    /// Create a new text file. Fails if the path exists.
    fn create_file(&self, path: &Path, contents: &str) -> Result<(), VaultError>;

    /// Create a new binary file. Fails if the path exists.
    fn create_binary_file(&self, path: &Path, contents: &[u8]) -> Result<(), VaultError>;

    /// Delete a file if present. Returns whether something was deleted.
    fn delete_if_exists(&self, path: &Path) -> Result<bool, VaultError>;

    fn path_exists(&self, path: &Path) -> bool;
}

/// A vault backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskVault {
    root: PathBuf,
}

impl DiskVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    fn create_new(&self, path: &Path, bytes: &[u8]) -> Result<(), VaultError> {
        let full = self.resolve(path);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| VaultError::from_io(path, e))?;
        file.write_all(bytes)
            .map_err(|e| VaultError::from_io(path, e))
    }
}

impl Vault for DiskVault {
    fn create_folder(&self, path: &Path) -> Result<(), VaultError> {
        let full = self.resolve(path);
        if full.is_dir() {
            return Err(VaultError::AlreadyExists(path.to_path_buf()));
        }
        fs::create_dir_all(&full).map_err(|e| VaultError::from_io(path, e))
    }

    fn create_file(&self, path: &Path, contents: &str) -> Result<(), VaultError> {
        self.create_new(path, contents.as_bytes())
    }

    fn create_binary_file(&self, path: &Path, contents: &[u8]) -> Result<(), VaultError> {
        self.create_new(path, contents)
    }

    fn delete_if_exists(&self, path: &Path) -> Result<bool, VaultError> {
        match fs::remove_file(self.resolve(path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::from_io(path, e)),
        }
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }
}

/// Delete whatever is at `path`, then create it with `contents`.
pub fn replace_file(vault: &impl Vault, path: &Path, contents: &str) -> Result<(), VaultError> {
    vault.delete_if_exists(path)?;
    vault.create_file(path, contents)
}

/// Binary counterpart of [`replace_file`].
pub fn replace_binary_file(
    vault: &impl Vault,
    path: &Path,
    contents: &[u8],
) -> Result<(), VaultError> {
    vault.delete_if_exists(path)?;
    vault.create_binary_file(path, contents)
}

/// Create a folder, treating "already exists" as success.
pub fn ensure_folder(vault: &impl Vault, path: &Path) -> Result<(), VaultError> {
    match vault.create_folder(path) {
        Ok(()) | Err(VaultError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
