//! Chunk assembly for hoard.
//!
//! Concatenates the staged chunks of a complete session, in declared
//! index order, into the final artifact and publishes the file record.
//! Peak memory is bounded to one chunk regardless of file size: each
//! chunk is appended and its staging file deleted before the next is
//! read.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::chunks::ChunkStore;
use super::session::UploadTracker;
use crate::catalog::{FileRecord, FileRepository, FolderRepository, NewFileRecord};
use crate::storage::StorageRoot;
use crate::{Database, HoardError, Result};

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The published (or already-existing) file record.
    pub record: FileRecord,
    /// A client-declared size disagreed with the assembled length. The
    /// assembled length is authoritative; the mismatch is informational.
    pub size_mismatch: bool,
}

/// Parameters for one merge invocation, typed by the boundary layer.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Normalized storage-relative destination path.
    pub target_path: String,
    /// Declared total chunk count. Used when no session state survives
    /// (for example after a restart); an in-flight session's own declared
    /// total takes precedence.
    pub total_chunks: u32,
    /// Size the client believes the final artifact has, if any.
    pub declared_size: Option<u64>,
    /// Owner forwarded by the boundary layer, if any.
    pub owner_id: Option<i64>,
    /// Visibility of the file record.
    pub is_public: bool,
}

/// Assembler turning complete sessions into published artifacts.
pub struct Assembler {
    db: Arc<Database>,
    root: StorageRoot,
    chunks: Arc<ChunkStore>,
}

impl Assembler {
    /// Create a new Assembler.
    pub fn new(db: Arc<Database>, root: StorageRoot, chunks: Arc<ChunkStore>) -> Self {
        Self { db, root, chunks }
    }

    /// Assemble the upload at `target_path` into its final artifact.
    ///
    /// With an in-flight session, the session must be complete; its lock
    /// is held for the whole merge so late chunk writes for the same path
    /// serialize against it, and the session is destroyed on success.
    /// Without session state, the staged chunks named by the request are
    /// merged directly; if nothing is staged and a record already exists
    /// at the path, that record is returned unchanged (safe retry of the
    /// merge trigger).
    pub async fn assemble(&self, tracker: &UploadTracker, request: MergeRequest) -> Result<MergeOutcome> {
        match tracker.get(&request.target_path) {
            Some(session) => {
                let session = session.lock().await;
                if let Some(missing) = session.first_missing() {
                    return Err(HoardError::MissingChunk(missing));
                }

                let merged = MergeRequest {
                    total_chunks: session.total_chunks,
                    owner_id: session.owner_id,
                    is_public: session.is_public,
                    ..request
                };
                let outcome = self.merge_chunks(&merged).await?;

                // Session state dies only after a successful merge; an
                // aborted merge keeps it for the retry.
                drop(session);
                tracker.remove(&merged.target_path);
                Ok(outcome)
            }
            None => {
                if !self.chunks.exists(&request.target_path, 0).await {
                    let repo = FileRepository::new(self.db.pool());
                    if let Some(existing) = repo.get_by_path(&request.target_path).await? {
                        // Already assembled: no chunks, no session. The
                        // retry gets the published record back.
                        return Ok(MergeOutcome {
                            record: existing,
                            size_mismatch: false,
                        });
                    }
                    return Err(HoardError::MissingChunk(0));
                }
                self.merge_chunks(&request).await
            }
        }
    }

    /// Concatenate staged chunks 0..total into the destination artifact
    /// and publish the file record.
    async fn merge_chunks(&self, request: &MergeRequest) -> Result<MergeOutcome> {
        let path = &request.target_path;
        self.root.ensure_parent(path).await?;

        let mut dest = tokio::fs::File::create(self.root.absolute(path)).await?;
        let mut assembled: u64 = 0;

        for index in 0..request.total_chunks {
            // Abort on the first gap: the partially written destination
            // stays unpublished and the remaining chunks stay staged, so
            // the client can re-submit the missing part and retry.
            let payload = self.chunks.read(path, index).await?;
            dest.write_all(&payload).await?;
            assembled += payload.len() as u64;
            self.chunks.delete(path, index).await?;
        }

        // The record must never reference a still-being-written artifact.
        dest.sync_all().await?;
        drop(dest);

        let size_mismatch = match request.declared_size {
            Some(declared) if declared != assembled => {
                warn!(
                    path = %path,
                    declared,
                    assembled,
                    "declared size differs from assembled length; assembled length is authoritative"
                );
                true
            }
            _ => false,
        };

        let record = self.publish(request, assembled as i64).await?;
        info!(
            path = %path,
            size = assembled,
            chunks = request.total_chunks,
            "upload assembled"
        );

        Ok(MergeOutcome {
            record,
            size_mismatch,
        })
    }

    /// Create (or refresh, for an overwriting upload) the file record.
    async fn publish(&self, request: &MergeRequest, size: i64) -> Result<FileRecord> {
        let files = FileRepository::new(self.db.pool());

        if let Some(existing) = files.get_by_path(&request.target_path).await? {
            return files
                .update_size(existing.id, size)
                .await?
                .ok_or_else(|| HoardError::NotFound("file".to_string()));
        }

        let folder_id = match StorageRoot::parent(&request.target_path) {
            Some(parent_path) => {
                let folders = FolderRepository::new(self.db.pool());
                folders.get_by_path(parent_path).await?.map(|f| f.id)
            }
            None => None,
        };

        let filename = StorageRoot::file_name(&request.target_path);
        let mut new_file = NewFileRecord::new(filename, request.target_path.clone(), size)
            .with_public(request.is_public);
        new_file.folder_id = folder_id;
        new_file.owner_id = request.owner_id;

        files.create(&new_file).await
    }
}
