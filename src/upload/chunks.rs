//! Chunk staging store for hoard.
//!
//! In-flight chunks live next to their eventual destination under a
//! derived name, `<targetPath>.part<index>`. These staging files are
//! internal: they are never exposed through listings or downloads, and
//! they are owned by this store until the assembler consumes them.

use std::io;

use crate::storage::StorageRoot;
use crate::{HoardError, Result};

/// Store for individual chunk payloads, keyed by (upload path, index).
#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: StorageRoot,
}

impl ChunkStore {
    /// Create a new ChunkStore over the given storage root.
    pub fn new(root: StorageRoot) -> Self {
        Self { root }
    }

    /// Staging path for one chunk of an upload.
    pub fn part_path(target_path: &str, index: u32) -> String {
        format!("{target_path}.part{index}")
    }

    /// Whether a file name denotes a chunk staging file.
    pub fn is_chunk_file(file_name: &str) -> bool {
        match file_name.rsplit_once(".part") {
            Some((stem, digits)) => {
                !stem.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
            None => false,
        }
    }

    /// Persist one chunk payload.
    ///
    /// Rewriting an existing (path, index) pair replaces the previous
    /// bytes: chunk submission is last-write-wins.
    pub async fn write(&self, target_path: &str, index: u32, payload: &[u8]) -> Result<()> {
        let part = Self::part_path(target_path, index);
        self.root.ensure_parent(&part).await?;
        tokio::fs::write(self.root.absolute(&part), payload).await?;
        Ok(())
    }

    /// Read one staged chunk.
    ///
    /// Fails with `MissingChunk` when the chunk is not present.
    pub async fn read(&self, target_path: &str, index: u32) -> Result<Vec<u8>> {
        let part = Self::part_path(target_path, index);
        match tokio::fs::read(self.root.absolute(&part)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(HoardError::MissingChunk(index)),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a chunk is staged.
    pub async fn exists(&self, target_path: &str, index: u32) -> bool {
        self.root.exists(&Self::part_path(target_path, index)).await
    }

    /// Delete one staged chunk.
    ///
    /// Returns `true` if a chunk was deleted, `false` if it wasn't there.
    pub async fn delete(&self, target_path: &str, index: u32) -> Result<bool> {
        self.root.remove_file(&Self::part_path(target_path, index)).await
    }

    /// Delete every staged chunk of an upload with indices below `total`.
    ///
    /// Returns the number of chunk files removed. Used when an abandoned
    /// session is evicted.
    pub async fn purge(&self, target_path: &str, total: u32) -> Result<usize> {
        let mut removed = 0;
        for index in 0..total {
            if self.delete(target_path, index).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
