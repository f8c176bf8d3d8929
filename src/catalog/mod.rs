//! Metadata catalog for hoard.
//!
//! This module provides the queryable index over stored content:
//! - File and folder records keyed by storage-relative path
//! - Path-uniqueness across both record kinds
//! - Subtree listing for the tree view and recursive deletes
//!
//! The physical filesystem is the source of truth for *existence*; the
//! catalog is the source of truth for ownership and visibility metadata.

mod file;
mod folder;

pub use file::{FileRecord, FileRepository, NewFileRecord};
pub use folder::{FolderRecord, FolderRepository, NewFolderRecord};

use sqlx::SqlitePool;

use crate::{HoardError, Result};

/// Fallback MIME type for unknown extensions.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Derive the MIME type for a filename from its extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
pub fn mime_type_for(filename: &str) -> &'static str {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Check whether a path is taken by any record, file or folder.
///
/// A path cannot simultaneously name a file and a folder, so creates in
/// either table consult both.
pub(crate) async fn path_taken(pool: &SqlitePool, path: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM files WHERE path = ?1)
             OR EXISTS(SELECT 1 FROM folders WHERE path = ?1)",
    )
    .bind(path)
    .fetch_one(pool)
    .await
    .map_err(|e| HoardError::Database(e.to_string()))?;

    Ok(taken)
}
