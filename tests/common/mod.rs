//! Shared fixtures for hoard integration tests.

use std::sync::Arc;

use tempfile::TempDir;

use hoard::{ChunkOutcome, Database, MergeOutcome, Result, StorageRoot, StorageService, StoreChunkRequest};

/// A service over a temporary storage root and an in-memory database.
///
/// The temp dir must stay alive as long as the service; dropping the
/// fixture tears both down.
pub struct TestService {
    pub temp_dir: TempDir,
    pub service: StorageService,
}

/// Build a fresh service on isolated storage.
pub async fn test_service() -> TestService {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let root = StorageRoot::new(temp_dir.path()).expect("Failed to create storage root");
    let service = StorageService::new(db, root);

    TestService { temp_dir, service }
}

impl TestService {
    /// Submit one chunk with no owner.
    pub async fn submit(
        &self,
        path: &str,
        index: u32,
        total: u32,
        payload: &[u8],
    ) -> Result<ChunkOutcome> {
        self.submit_owned(path, index, total, payload, None).await
    }

    /// Submit one chunk on behalf of an owner.
    pub async fn submit_owned(
        &self,
        path: &str,
        index: u32,
        total: u32,
        payload: &[u8],
        owner_id: Option<i64>,
    ) -> Result<ChunkOutcome> {
        self.service
            .store_chunk(StoreChunkRequest {
                target_path: path.to_string(),
                index,
                total_chunks: total,
                payload: payload.to_vec(),
                owner_id,
                is_public: false,
            })
            .await
    }

    /// Trigger assembly for an upload.
    pub async fn merge(&self, path: &str, total: u32) -> Result<MergeOutcome> {
        self.service.merge(path, total, None, None, false).await
    }

    /// Read the assembled artifact straight from disk.
    pub async fn read_artifact(&self, rel: &str) -> Vec<u8> {
        tokio::fs::read(self.service.root().absolute(rel))
            .await
            .expect("Failed to read artifact")
    }
}
