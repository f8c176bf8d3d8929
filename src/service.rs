//! Storage service facade for hoard.
//!
//! One `StorageService` is constructed per process and handed to the
//! boundary layer. It owns the upload tracker and assembler, shares the
//! metadata catalog and chunk store by reference with them, and is the
//! only entry point the boundary calls. Every operation takes a raw
//! target path and normalizes it before anything touches storage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::catalog::{
    self, FileRecord, FileRepository, FolderRecord, FolderRepository, NewFolderRecord,
};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::storage::StorageRoot;
use crate::upload::{
    Assembler, ChunkOutcome, ChunkStore, ChunkSubmission, MergeOutcome, MergeRequest, UploadTracker,
};
use crate::{Database, HoardError, Result};

/// Default idle time before an incomplete upload is evicted.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// One chunk handed in by the boundary layer, pre-typed but with the
/// target path still raw.
#[derive(Debug, Clone)]
pub struct StoreChunkRequest {
    /// Raw target path as supplied by the client.
    pub target_path: String,
    /// 0-based chunk index.
    pub index: u32,
    /// Declared total chunk count.
    pub total_chunks: u32,
    /// Chunk payload.
    pub payload: Vec<u8>,
    /// Authenticated owner, if any.
    pub owner_id: Option<i64>,
    /// Visibility of the eventual file record.
    pub is_public: bool,
}

/// Resolved download: where the artifact lives and how to present it.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    /// Absolute path of the artifact on disk.
    pub absolute_path: PathBuf,
    /// Display filename (last path component).
    pub filename: String,
    /// MIME type from the record, or extension-derived for unindexed files.
    pub mime_type: String,
    /// Byte length on disk.
    pub size: u64,
    /// The catalog record, when one exists.
    pub record: Option<FileRecord>,
}

/// Folder-tree listing: all folders and files, optionally scoped.
#[derive(Debug, Clone, Default)]
pub struct TreeListing {
    /// Folder records, ordered by path.
    pub folders: Vec<FolderRecord>,
    /// File records, ordered by path.
    pub files: Vec<FileRecord>,
}

/// The service facade over the upload pipeline, catalog, and scanner.
pub struct StorageService {
    db: Arc<Database>,
    root: StorageRoot,
    tracker: UploadTracker,
    assembler: Assembler,
    reconciler: Reconciler,
    upload_timeout: Duration,
}

impl StorageService {
    /// Create a new StorageService over the given database and root.
    pub fn new(db: Arc<Database>, root: StorageRoot) -> Self {
        let chunks = Arc::new(ChunkStore::new(root.clone()));
        let tracker = UploadTracker::new(chunks.clone());
        let assembler = Assembler::new(db.clone(), root.clone(), chunks);
        let reconciler = Reconciler::new(db.clone(), root.clone());
        Self {
            db,
            root,
            tracker,
            assembler,
            reconciler,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Set the idle timeout for stale-session eviction.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// The storage root backing this service.
    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// The database backing this service.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Accept one uploaded chunk.
    ///
    /// Returns whether the session became complete; completeness is the
    /// caller's cue to trigger [`StorageService::merge`].
    pub async fn store_chunk(&self, request: StoreChunkRequest) -> Result<ChunkOutcome> {
        let target_path = self.root.normalize(&request.target_path)?;

        self.tracker
            .submit_chunk(ChunkSubmission {
                target_path,
                index: request.index,
                total_chunks: request.total_chunks,
                payload: request.payload,
                owner_id: request.owner_id,
                is_public: request.is_public,
            })
            .await
    }

    /// Assemble a completed upload into its final artifact and publish
    /// the file record.
    pub async fn merge(
        &self,
        raw_path: &str,
        total_chunks: u32,
        declared_size: Option<u64>,
        owner_id: Option<i64>,
        is_public: bool,
    ) -> Result<MergeOutcome> {
        let target_path = self.root.normalize(raw_path)?;

        self.assembler
            .assemble(
                &self.tracker,
                MergeRequest {
                    target_path,
                    total_chunks,
                    declared_size,
                    owner_id,
                    is_public,
                },
            )
            .await
    }

    /// Resolve a path for download.
    ///
    /// The physical filesystem decides existence; the catalog record,
    /// when present, supplies the MIME type. Chunk staging files are
    /// never served.
    pub async fn open_download(&self, raw_path: &str) -> Result<DownloadTarget> {
        let rel = self.root.normalize(raw_path)?;

        let filename = StorageRoot::file_name(&rel).to_string();
        if ChunkStore::is_chunk_file(&filename) {
            return Err(HoardError::NotFound(format!("file {rel}")));
        }

        let size = self.root.file_size(&rel).await?;
        if self.root.is_dir(&rel).await {
            return Err(HoardError::NotFound(format!("file {rel}")));
        }

        let record = FileRepository::new(self.db.pool()).get_by_path(&rel).await?;
        let mime_type = record
            .as_ref()
            .map(|r| r.mime_type.clone())
            .unwrap_or_else(|| catalog::mime_type_for(&filename).to_string());

        Ok(DownloadTarget {
            absolute_path: self.root.absolute(&rel),
            filename,
            mime_type,
            size,
            record,
        })
    }

    /// Create a folder: the physical directory plus its record.
    pub async fn create_folder(&self, raw_path: &str, owner_id: Option<i64>) -> Result<FolderRecord> {
        let rel = self.root.normalize(raw_path)?;

        let folders = FolderRepository::new(self.db.pool());
        let parent_id = match StorageRoot::parent(&rel) {
            Some(parent) => Some(
                folders
                    .get_by_path(parent)
                    .await?
                    .ok_or_else(|| HoardError::NotFound(format!("folder {parent}")))?
                    .id,
            ),
            None => None,
        };

        let mut new_folder = NewFolderRecord::new(StorageRoot::file_name(&rel), rel.clone());
        new_folder.parent_id = parent_id;
        new_folder.owner_id = owner_id;

        let record = folders.create(&new_folder).await?;
        tokio::fs::create_dir_all(self.root.absolute(&rel)).await?;

        Ok(record)
    }

    /// List the folder tree, optionally scoped to a subtree.
    pub async fn list_tree(&self, subtree: Option<&str>) -> Result<TreeListing> {
        let folders = FolderRepository::new(self.db.pool());
        let files = FileRepository::new(self.db.pool());

        match subtree {
            Some(raw) => {
                let rel = self.root.normalize(raw)?;
                if folders.get_by_path(&rel).await?.is_none() {
                    return Err(HoardError::NotFound(format!("folder {rel}")));
                }
                Ok(TreeListing {
                    folders: folders.list_subtree(&rel).await?,
                    files: files.list_subtree(&rel).await?,
                })
            }
            None => Ok(TreeListing {
                folders: folders.list_all().await?,
                files: files.list_all().await?,
            }),
        }
    }

    /// Delete a file or folder by path, physically and from the catalog.
    ///
    /// Deleting a folder removes its whole subtree. When some physical
    /// members survive the attempt, the catalog is re-aligned with what
    /// actually remains and `PartialDelete` is returned; records are
    /// never dropped for content that still exists.
    pub async fn delete_path(&self, raw_path: &str) -> Result<()> {
        let rel = self.root.normalize(raw_path)?;

        if ChunkStore::is_chunk_file(StorageRoot::file_name(&rel)) {
            return Err(HoardError::NotFound(format!("path {rel}")));
        }

        let folders = FolderRepository::new(self.db.pool());
        let files = FileRepository::new(self.db.pool());

        if self.root.is_dir(&rel).await || folders.get_by_path(&rel).await?.is_some() {
            return self.delete_folder(&rel).await;
        }

        let removed_physical = self.root.remove_file(&rel).await?;
        let removed_record = files.delete_by_path(&rel).await?;

        if !removed_physical && !removed_record {
            return Err(HoardError::NotFound(format!("path {rel}")));
        }

        info!(path = %rel, "file deleted");
        Ok(())
    }

    async fn delete_folder(&self, rel: &str) -> Result<()> {
        let folders = FolderRepository::new(self.db.pool());
        let files = FileRepository::new(self.db.pool());

        match self.root.remove_dir_recursive(rel).await {
            Ok(_) => {
                files.delete_subtree(rel).await?;
                folders.delete_subtree(rel).await?;
                info!(path = %rel, "folder subtree deleted");
                Ok(())
            }
            Err(e) => {
                warn!(path = %rel, error = %e, "physical subtree delete incomplete");

                // Keep the index consistent with whatever survived: drop
                // records only for members that are actually gone.
                let mut removed = 0;
                let mut remaining = 0;

                for file in files.list_subtree(rel).await? {
                    if self.root.exists(&file.path).await {
                        remaining += 1;
                    } else {
                        files.delete(file.id).await?;
                        removed += 1;
                    }
                }

                // Deepest folders first so parents outlive children.
                let mut subtree_folders = folders.list_subtree(rel).await?;
                subtree_folders.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
                for folder in subtree_folders {
                    if self.root.exists(&folder.path).await {
                        remaining += 1;
                    } else {
                        folders.delete(folder.id).await?;
                        removed += 1;
                    }
                }

                Err(HoardError::PartialDelete {
                    path: rel.to_string(),
                    removed,
                    remaining,
                })
            }
        }
    }

    /// Move a file or folder to a new path, physically and in the catalog.
    pub async fn move_path(&self, raw_from: &str, raw_to: &str) -> Result<()> {
        let from = self.root.normalize(raw_from)?;
        let to = self.root.normalize(raw_to)?;

        // Both halves of the conflict check come before the physical
        // rename, so a failure cannot leave disk and catalog disagreeing.
        if self.root.exists(&to).await || catalog::path_taken(self.db.pool(), &to).await? {
            return Err(HoardError::PathConflict(to));
        }

        let folders = FolderRepository::new(self.db.pool());
        let files = FileRepository::new(self.db.pool());

        let dest_parent_id = match StorageRoot::parent(&to) {
            Some(parent) => folders.get_by_path(parent).await?.map(|f| f.id),
            None => None,
        };

        if let Some(folder) = folders.get_by_path(&from).await? {
            self.root.ensure_parent(&to).await?;
            tokio::fs::rename(self.root.absolute(&from), self.root.absolute(&to)).await?;

            folders.move_to(folder.id, &to, dest_parent_id).await?;
            folders.rebase_subtree(&from, &to).await?;
            files.rebase_subtree(&from, &to).await?;
            info!(from = %from, to = %to, "folder moved");
            return Ok(());
        }

        if let Some(file) = files.get_by_path(&from).await? {
            self.root.ensure_parent(&to).await?;
            tokio::fs::rename(self.root.absolute(&from), self.root.absolute(&to)).await?;

            files.move_to(file.id, &to, dest_parent_id).await?;
            info!(from = %from, to = %to, "file moved");
            return Ok(());
        }

        Err(HoardError::NotFound(format!("path {from}")))
    }

    /// Evict upload sessions idle past the configured timeout and purge
    /// their staged chunks. Returns the evicted target paths.
    pub async fn sweep_stale(&self) -> Result<Vec<String>> {
        self.tracker.sweep_stale(self.upload_timeout).await
    }

    /// Run one reconciliation pass over the storage tree.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.reconciler.reconcile().await
    }
}
