//! Request and response payloads for the hoard web boundary.

use serde::{Deserialize, Serialize};

use crate::catalog::{FileRecord, FolderRecord};
use crate::service::TreeListing;

/// Generic wrapper for successful responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Response payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// GET /status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Human-readable liveness message.
    pub message: String,
    /// Server time, RFC 3339.
    pub timestamp: String,
}

/// POST /upload response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkUploadResponse {
    /// Normalized target path of the upload.
    pub path: String,
    /// Index that was accepted.
    pub chunk_index: u32,
    /// Declared total chunk count.
    pub total_chunks: u32,
    /// Whether every declared chunk has now been received.
    pub session_complete: bool,
}

/// POST /merge request body.
#[derive(Debug, Deserialize)]
pub struct MergeBody {
    /// Target path of the completed upload.
    pub filename: String,
    /// Declared total chunk count.
    pub total_chunks: u32,
    /// Size the client believes the file has, if it wants the cross-check.
    #[serde(default)]
    pub size: Option<u64>,
    /// Owner to record, if any.
    #[serde(default)]
    pub owner_id: Option<i64>,
    /// Whether the file is publicly visible.
    #[serde(default)]
    pub is_public: bool,
}

/// A file record as presented over the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileResponse {
    pub id: i64,
    pub filename: String,
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    pub folder_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            path: record.path,
            size: record.size,
            mime_type: record.mime_type,
            folder_id: record.folder_id,
            owner_id: record.owner_id,
            is_public: record.is_public,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// A folder record as presented over the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct FolderResponse {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub parent_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub created_at: String,
}

impl From<FolderRecord> for FolderResponse {
    fn from(record: FolderRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            path: record.path,
            parent_id: record.parent_id,
            owner_id: record.owner_id,
            created_at: record.created_at,
        }
    }
}

/// POST /merge response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MergeResponse {
    /// The published file record.
    pub file: FileResponse,
    /// The client-declared size disagreed with the assembled length.
    pub size_mismatch: bool,
}

/// GET /files response: the folder tree.
#[derive(Debug, Serialize, Deserialize)]
pub struct TreeResponse {
    /// Folder records, ordered by path.
    pub folders: Vec<FolderResponse>,
    /// File records, ordered by path.
    pub files: Vec<FileResponse>,
}

impl From<TreeListing> for TreeResponse {
    fn from(listing: TreeListing) -> Self {
        Self {
            folders: listing.folders.into_iter().map(Into::into).collect(),
            files: listing.files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Query parameters for GET /files.
#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    /// Restrict the listing to this folder subtree.
    #[serde(default)]
    pub subtree: Option<String>,
}

/// DELETE /delete response.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Path that was deleted.
    pub path: String,
}

/// POST /scan response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    /// Folder records created by the pass.
    pub folders_created: usize,
    /// File records created by the pass.
    pub files_created: usize,
    /// Entries skipped as unreadable.
    pub entries_skipped: usize,
}
