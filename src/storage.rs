//! Physical storage root for hoard.
//!
//! The directory tree under the root mirrors the logical folder tree
//! exactly: a folder record's path is always a real directory, a file
//! record's path is always a real file at that exact relative path.
//! All externally supplied paths pass through [`StorageRoot::normalize`]
//! before anything touches the filesystem.

use std::io;
use std::path::{Path, PathBuf};

use crate::{HoardError, Result};

/// Storage root owning the base directory for uploaded files.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    base_path: PathBuf,
}

impl StorageRoot {
    /// Create a new StorageRoot at the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage root.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Normalize an externally supplied target path.
    ///
    /// Returns the `/`-separated storage-relative form. Fails with
    /// `InvalidPath` before any storage is touched when the input is
    /// absolute, empty, or would resolve outside the root.
    pub fn normalize(&self, raw: &str) -> Result<String> {
        if raw.starts_with('/') || raw.starts_with('\\') {
            return Err(HoardError::InvalidPath(raw.to_string()));
        }
        if raw.contains('\0') {
            return Err(HoardError::InvalidPath(raw.to_string()));
        }

        let mut components: Vec<&str> = Vec::new();
        for part in raw.split(['/', '\\']) {
            match part {
                "" | "." => continue,
                ".." => {
                    // Never allowed, even when a later segment would bring
                    // the path back under the root.
                    return Err(HoardError::InvalidPath(raw.to_string()));
                }
                other => components.push(other),
            }
        }

        if components.is_empty() {
            return Err(HoardError::InvalidPath(raw.to_string()));
        }

        Ok(components.join("/"))
    }

    /// Get the absolute path for a normalized storage-relative path.
    pub fn absolute(&self, rel: &str) -> PathBuf {
        self.base_path.join(rel)
    }

    /// The final path component of a normalized relative path.
    pub fn file_name(rel: &str) -> &str {
        rel.rsplit('/').next().unwrap_or(rel)
    }

    /// The parent of a normalized relative path, or None at the root.
    pub fn parent(rel: &str) -> Option<&str> {
        rel.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// Ensure the parent directory of a relative file path exists.
    pub async fn ensure_parent(&self, rel: &str) -> Result<()> {
        if let Some(parent) = self.absolute(rel).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Check whether a relative path exists physically.
    pub async fn exists(&self, rel: &str) -> bool {
        tokio::fs::try_exists(self.absolute(rel)).await.unwrap_or(false)
    }

    /// Whether a relative path is a directory.
    pub async fn is_dir(&self, rel: &str) -> bool {
        tokio::fs::metadata(self.absolute(rel))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Get the byte length of a stored file.
    pub async fn file_size(&self, rel: &str) -> Result<u64> {
        match tokio::fs::metadata(self.absolute(rel)).await {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(HoardError::NotFound(format!("file {rel}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub async fn remove_file(&self, rel: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.absolute(rel)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a directory and everything under it.
    ///
    /// Returns `true` if the directory was deleted, `false` if it didn't
    /// exist. Errors other than absence are surfaced to the caller, which
    /// owns reconciling the index against whatever survived.
    pub async fn remove_dir_recursive(&self, rel: &str) -> Result<bool> {
        match tokio::fs::remove_dir_all(self.absolute(rel)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
