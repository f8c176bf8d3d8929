//! hoard - chunked file upload and storage backend.
//!
//! Clients upload large files in chunks over unreliable connections; the
//! server reassembles them into single artifacts and keeps a queryable
//! metadata catalog (owner, folder, size, MIME type) synchronized with
//! what actually exists on disk.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod service;
pub mod storage;
pub mod upload;
pub mod web;

pub use catalog::{
    mime_type_for, FileRecord, FileRepository, FolderRecord, FolderRepository, NewFileRecord,
    NewFolderRecord,
};
pub use config::Config;
pub use db::Database;
pub use error::{HoardError, Result};
pub use reconcile::{ReconcileReport, Reconciler};
pub use service::{DownloadTarget, StorageService, StoreChunkRequest, TreeListing};
pub use storage::StorageRoot;
pub use upload::{
    Assembler, ChunkOutcome, ChunkStore, ChunkSubmission, MergeOutcome, MergeRequest,
    UploadSession, UploadTracker,
};
