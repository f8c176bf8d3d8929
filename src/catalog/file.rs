//! File records and repository for the hoard catalog.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{HoardError, Result};

/// A file record mirroring a real file under the storage root.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Display filename (last path component).
    pub filename: String,
    /// Storage-relative path. Unique across files and folders.
    pub path: String,
    /// File size in bytes.
    pub size: i64,
    /// MIME type derived from the filename extension.
    pub mime_type: String,
    /// Enclosing folder ID (None for files directly under the root).
    pub folder_id: Option<i64>,
    /// Owner ID (None for orphan records created by reconciliation).
    pub owner_id: Option<i64>,
    /// Public/private visibility.
    pub is_public: bool,
    /// When the record was created.
    pub created_at: String,
    /// When the record was last updated.
    pub updated_at: String,
}

impl FileRecord {
    /// Get the created_at as DateTime<Utc>.
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("{}Z", self.created_at))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Display filename (last path component).
    pub filename: String,
    /// Storage-relative path.
    pub path: String,
    /// File size in bytes.
    pub size: i64,
    /// MIME type. Defaults to the extension-derived type for the filename.
    pub mime_type: String,
    /// Enclosing folder ID.
    pub folder_id: Option<i64>,
    /// Owner ID.
    pub owner_id: Option<i64>,
    /// Public/private visibility.
    pub is_public: bool,
}

impl NewFileRecord {
    /// Create a new NewFileRecord.
    ///
    /// The MIME type is derived from the filename extension.
    pub fn new(filename: impl Into<String>, path: impl Into<String>, size: i64) -> Self {
        let filename = filename.into();
        let mime_type = super::mime_type_for(&filename).to_string();
        Self {
            filename,
            path: path.into(),
            size,
            mime_type,
            folder_id: None,
            owner_id: None,
            is_public: false,
        }
    }

    /// Set the enclosing folder.
    pub fn with_folder(mut self, folder_id: i64) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Set public visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}

/// Repository for file record operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new file record.
    ///
    /// Validates that the path is not already taken by any record, file
    /// or folder.
    pub async fn create(&self, file: &NewFileRecord) -> Result<FileRecord> {
        if super::path_taken(self.pool, &file.path).await? {
            return Err(HoardError::PathConflict(file.path.clone()));
        }

        let result = sqlx::query(
            "INSERT INTO files (filename, path, size, mime_type, folder_id, owner_id, is_public)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.filename)
        .bind(&file.path)
        .bind(file.size)
        .bind(&file.mime_type)
        .bind(file.folder_id)
        .bind(file.owner_id)
        .bind(file.is_public)
        .execute(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| HoardError::NotFound("file".to_string()))
    }

    /// Get a file record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, path, size, mime_type, folder_id, owner_id, is_public,
                    created_at, updated_at
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Get a file record by exact storage-relative path.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, path, size, mime_type, folder_id, owner_id, is_public,
                    created_at, updated_at
             FROM files WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(file)
    }

    /// List files in a folder (None lists files directly under the root).
    pub async fn list_by_folder(&self, folder_id: Option<i64>) -> Result<Vec<FileRecord>> {
        let files = match folder_id {
            Some(id) => {
                sqlx::query_as::<_, FileRecord>(
                    "SELECT id, filename, path, size, mime_type, folder_id, owner_id, is_public,
                            created_at, updated_at
                     FROM files WHERE folder_id = ? ORDER BY path",
                )
                .bind(id)
                .fetch_all(self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, FileRecord>(
                    "SELECT id, filename, path, size, mime_type, folder_id, owner_id, is_public,
                            created_at, updated_at
                     FROM files WHERE folder_id IS NULL ORDER BY path",
                )
                .fetch_all(self.pool)
                .await
            }
        }
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List every file record, ordered by path.
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, path, size, mime_type, folder_id, owner_id, is_public,
                    created_at, updated_at
             FROM files ORDER BY path",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List file records under the folder subtree rooted at `path`,
    /// ordered by path.
    pub async fn list_subtree(&self, path: &str) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, path, size, mime_type, folder_id, owner_id, is_public,
                    created_at, updated_at
             FROM files WHERE path LIKE ?1 || '/%' ORDER BY path",
        )
        .bind(path)
        .fetch_all(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Move a file record to a new path and folder.
    ///
    /// Fails with `PathConflict` when the destination path is taken.
    pub async fn move_to(
        &self,
        id: i64,
        new_path: &str,
        new_folder_id: Option<i64>,
    ) -> Result<Option<FileRecord>> {
        if super::path_taken(self.pool, new_path).await? {
            return Err(HoardError::PathConflict(new_path.to_string()));
        }

        let filename = new_path.rsplit('/').next().unwrap_or(new_path);
        let result = sqlx::query(
            "UPDATE files SET filename = ?, path = ?, folder_id = ?, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(filename)
        .bind(new_path)
        .bind(new_folder_id)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Update the recorded size of a file after its artifact was rewritten.
    pub async fn update_size(&self, id: i64, size: i64) -> Result<Option<FileRecord>> {
        let result = sqlx::query(
            "UPDATE files SET size = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(size)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Rewrite the paths of every file record under `old_prefix` to live
    /// under `new_prefix` instead. Returns the number rebased.
    pub async fn rebase_subtree(&self, old_prefix: &str, new_prefix: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE files
             SET path = ?2 || substr(path, length(?1) + 1), updated_at = datetime('now')
             WHERE path LIKE ?1 || '/%'",
        )
        .bind(old_prefix)
        .bind(new_prefix)
        .execute(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Delete a file record by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a file record by exact path.
    pub async fn delete_by_path(&self, path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE path = ?")
            .bind(path)
            .execute(self.pool)
            .await
            .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every file record under the folder subtree rooted at `path`.
    /// Returns the number removed.
    pub async fn delete_subtree(&self, path: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM files WHERE path LIKE ?1 || '/%'")
            .bind(path)
            .execute(self.pool)
            .await
            .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
