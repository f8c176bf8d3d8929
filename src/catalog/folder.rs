//! Folder records and repository for the hoard catalog.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{HoardError, Result};

/// A folder record mirroring a real directory under the storage root.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FolderRecord {
    /// Unique folder ID.
    pub id: i64,
    /// Directory name (last path component).
    pub name: String,
    /// Storage-relative path. Unique across folders and files.
    pub path: String,
    /// Parent folder ID (None for folders directly under the root).
    pub parent_id: Option<i64>,
    /// Owner ID (None for orphan records created by reconciliation).
    pub owner_id: Option<i64>,
    /// When the record was created.
    pub created_at: String,
    /// When the record was last updated.
    pub updated_at: String,
}

impl FolderRecord {
    /// Get the created_at as DateTime<Utc>.
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("{}Z", self.created_at))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

/// Data for creating a new folder record.
#[derive(Debug, Clone)]
pub struct NewFolderRecord {
    /// Directory name (last path component).
    pub name: String,
    /// Storage-relative path.
    pub path: String,
    /// Parent folder ID.
    pub parent_id: Option<i64>,
    /// Owner ID.
    pub owner_id: Option<i64>,
}

impl NewFolderRecord {
    /// Create a new NewFolderRecord with no parent and no owner.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parent_id: None,
            owner_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }
}

/// Repository for folder record operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder record.
    ///
    /// Validates that the parent folder, if given, exists and that the
    /// path is not already taken by any record, file or folder.
    pub async fn create(&self, folder: &NewFolderRecord) -> Result<FolderRecord> {
        if let Some(parent_id) = folder.parent_id {
            if self.get_by_id(parent_id).await?.is_none() {
                return Err(HoardError::NotFound(format!("parent folder {parent_id}")));
            }
        }

        if super::path_taken(self.pool, &folder.path).await? {
            return Err(HoardError::PathConflict(folder.path.clone()));
        }

        let result = sqlx::query(
            "INSERT INTO folders (name, path, parent_id, owner_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(folder.parent_id)
        .bind(folder.owner_id)
        .execute(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| HoardError::NotFound("folder".to_string()))
    }

    /// Get a folder record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FolderRecord>> {
        let folder = sqlx::query_as::<_, FolderRecord>(
            "SELECT id, name, path, parent_id, owner_id, created_at, updated_at
             FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// Get a folder record by exact storage-relative path.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<FolderRecord>> {
        let folder = sqlx::query_as::<_, FolderRecord>(
            "SELECT id, name, path, parent_id, owner_id, created_at, updated_at
             FROM folders WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// List child folders of a parent (None lists root-level folders).
    pub async fn list_by_parent(&self, parent_id: Option<i64>) -> Result<Vec<FolderRecord>> {
        let folders = match parent_id {
            Some(id) => {
                sqlx::query_as::<_, FolderRecord>(
                    "SELECT id, name, path, parent_id, owner_id, created_at, updated_at
                     FROM folders WHERE parent_id = ? ORDER BY path",
                )
                .bind(id)
                .fetch_all(self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, FolderRecord>(
                    "SELECT id, name, path, parent_id, owner_id, created_at, updated_at
                     FROM folders WHERE parent_id IS NULL ORDER BY path",
                )
                .fetch_all(self.pool)
                .await
            }
        }
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// List every folder record, ordered by path.
    pub async fn list_all(&self) -> Result<Vec<FolderRecord>> {
        let folders = sqlx::query_as::<_, FolderRecord>(
            "SELECT id, name, path, parent_id, owner_id, created_at, updated_at
             FROM folders ORDER BY path",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// List folder records in the subtree rooted at `path`, including the
    /// root folder itself, ordered by path.
    pub async fn list_subtree(&self, path: &str) -> Result<Vec<FolderRecord>> {
        let folders = sqlx::query_as::<_, FolderRecord>(
            "SELECT id, name, path, parent_id, owner_id, created_at, updated_at
             FROM folders WHERE path = ?1 OR path LIKE ?1 || '/%' ORDER BY path",
        )
        .bind(path)
        .fetch_all(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// Move a folder record to a new path and parent.
    ///
    /// Fails with `PathConflict` when the destination path is taken.
    pub async fn move_to(
        &self,
        id: i64,
        new_path: &str,
        new_parent_id: Option<i64>,
    ) -> Result<Option<FolderRecord>> {
        if super::path_taken(self.pool, new_path).await? {
            return Err(HoardError::PathConflict(new_path.to_string()));
        }

        let name = new_path.rsplit('/').next().unwrap_or(new_path);
        let result = sqlx::query(
            "UPDATE folders SET name = ?, path = ?, parent_id = ?, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(name)
        .bind(new_path)
        .bind(new_parent_id)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| HoardError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Rewrite the paths of every record under `old_prefix` to live under
    /// `new_prefix` instead. The subtree root itself is not touched; move
    /// it with [`FolderRepository::move_to`]. Returns the number rebased.
    pub async fn rebase_subtree(&self, old_prefix: &str, new_prefix: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE folders
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

    /// Delete a folder record by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every folder record in the subtree rooted at `path`,
    /// including the root folder itself. Returns the number removed.
    pub async fn delete_subtree(&self, path: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM folders WHERE path = ?1 OR path LIKE ?1 || '/%'")
            .bind(path)
            .execute(self.pool)
            .await
            .map_err(|e| HoardError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
