//! Upload session tracking for hoard.
//!
//! One session exists per in-flight target path. Session state is the
//! authoritative record of upload progress: the filesystem is never
//! scanned to decide whether an upload is complete.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use super::chunks::ChunkStore;
use crate::{HoardError, Result};

/// State of one upload session.
///
/// The upload id is the normalized target path; it doubles as the key in
/// the tracker map.
#[derive(Debug)]
pub struct UploadSession {
    /// Normalized storage-relative destination path.
    pub target_path: String,
    /// Chunk count declared on the first submission, fixed for the
    /// session's lifetime.
    pub total_chunks: u32,
    /// Indices received so far. Always a subset of `0..total_chunks`.
    pub received: HashSet<u32>,
    /// Owner forwarded by the boundary layer, if any.
    pub owner_id: Option<i64>,
    /// Visibility of the eventual file record.
    pub is_public: bool,
    /// Last time a chunk arrived for this session.
    last_activity: Instant,
}

impl UploadSession {
    fn new(target_path: String, total_chunks: u32, owner_id: Option<i64>, is_public: bool) -> Self {
        Self {
            target_path,
            total_chunks,
            received: HashSet::new(),
            owner_id,
            is_public,
            last_activity: Instant::now(),
        }
    }

    /// A session is complete when every declared index has been received.
    pub fn is_complete(&self) -> bool {
        self.received.len() as u32 == self.total_chunks
    }

    /// The lowest declared index that has not been received yet.
    pub fn first_missing(&self) -> Option<u32> {
        (0..self.total_chunks).find(|i| !self.received.contains(i))
    }
}

/// One chunk submission, already validated and typed by the boundary.
#[derive(Debug, Clone)]
pub struct ChunkSubmission {
    /// Normalized storage-relative destination path.
    pub target_path: String,
    /// 0-based chunk index.
    pub index: u32,
    /// Declared total chunk count for the whole upload.
    pub total_chunks: u32,
    /// Chunk payload.
    pub payload: Vec<u8>,
    /// Owner forwarded by the boundary layer, if any.
    pub owner_id: Option<i64>,
    /// Visibility of the eventual file record.
    pub is_public: bool,
}

/// Result of accepting one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// The chunk was persisted and counted.
    pub accepted: bool,
    /// Every declared index has now been received. This is the sole
    /// trigger for handing the session to the assembler.
    pub session_complete: bool,
}

/// Tracker for all in-flight upload sessions.
///
/// The outer map lock is held only to look up or insert a session entry;
/// each session owns an async mutex serializing its membership updates,
/// so submissions for distinct paths proceed in parallel.
pub struct UploadTracker {
    sessions: StdMutex<HashMap<String, Arc<Mutex<UploadSession>>>>,
    chunks: Arc<ChunkStore>,
}

impl UploadTracker {
    /// Create a new tracker persisting chunks through the given store.
    pub fn new(chunks: Arc<ChunkStore>) -> Self {
        Self {
            sessions: StdMutex::new(HashMap::new()),
            chunks,
        }
    }

    /// Accept one chunk: persist it and update session membership.
    ///
    /// The first submission for a path creates the session and fixes its
    /// declared total. Re-sending an already-received index overwrites the
    /// staged bytes (last write wins). Returns whether the session became
    /// complete.
    pub async fn submit_chunk(&self, submission: ChunkSubmission) -> Result<ChunkOutcome> {
        if submission.total_chunks == 0 {
            return Err(HoardError::Validation(
                "total_chunks must be at least 1".to_string(),
            ));
        }
        if submission.index >= submission.total_chunks {
            return Err(HoardError::Validation(format!(
                "chunk index {} out of range for {} chunks",
                submission.index, submission.total_chunks
            )));
        }

        let session = self.entry(&submission);

        let mut session = session.lock().await;
        if session.total_chunks != submission.total_chunks {
            return Err(HoardError::Validation(format!(
                "session for {} declared {} chunks, got {}",
                session.target_path, session.total_chunks, submission.total_chunks
            )));
        }

        self.chunks
            .write(&submission.target_path, submission.index, &submission.payload)
            .await?;

        session.received.insert(submission.index);
        session.last_activity = Instant::now();

        let session_complete = session.is_complete();
        debug!(
            path = %session.target_path,
            index = submission.index,
            received = session.received.len(),
            total = session.total_chunks,
            "chunk accepted"
        );

        Ok(ChunkOutcome {
            accepted: true,
            session_complete,
        })
    }

    fn entry(&self, submission: &ChunkSubmission) -> Arc<Mutex<UploadSession>> {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions
            .entry(submission.target_path.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(UploadSession::new(
                    submission.target_path.clone(),
                    submission.total_chunks,
                    submission.owner_id,
                    submission.is_public,
                )))
            })
            .clone()
    }

    /// Look up the session for a target path.
    pub fn get(&self, target_path: &str) -> Option<Arc<Mutex<UploadSession>>> {
        self.sessions
            .lock()
            .expect("session map poisoned")
            .get(target_path)
            .cloned()
    }

    /// Drop the session for a target path. Staged chunks are not touched.
    pub fn remove(&self, target_path: &str) -> bool {
        self.sessions
            .lock()
            .expect("session map poisoned")
            .remove(target_path)
            .is_some()
    }

    /// Number of in-flight sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session map poisoned").len()
    }

    /// Whether no sessions are in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict sessions idle for longer than `max_idle` and purge their
    /// staged chunks. Returns the evicted target paths.
    ///
    /// This sweep is the only garbage collection for abandoned uploads.
    pub async fn sweep_stale(&self, max_idle: Duration) -> Result<Vec<String>> {
        let stale: Vec<(String, Arc<Mutex<UploadSession>>)> = {
            let sessions = self.sessions.lock().expect("session map poisoned");
            sessions
                .iter()
                .map(|(path, session)| (path.clone(), session.clone()))
                .collect()
        };

        let mut evicted = Vec::new();
        for (path, session) in stale {
            let total = {
                let session = session.lock().await;
                if session.last_activity.elapsed() < max_idle {
                    continue;
                }
                session.total_chunks
            };

            // Re-check under the map lock so a session that just received
            // a chunk between the two locks is not dropped.
            let removed = {
                let mut sessions = self.sessions.lock().expect("session map poisoned");
                match sessions.get(&path) {
                    Some(current) if Arc::ptr_eq(current, &session) => {
                        sessions.remove(&path);
                        true
                    }
                    _ => false,
                }
            };

            if removed {
                let purged = self.chunks.purge(&path, total).await?;
                debug!(path = %path, purged, "evicted stale upload session");
                evicted.push(path);
            }
        }

        Ok(evicted)
    }
}
