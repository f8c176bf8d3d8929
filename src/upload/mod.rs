//! Upload pipeline for hoard.
//!
//! This module covers the in-flight half of the system:
//! - Chunk staging under `<targetPath>.part<index>` names
//! - Per-path session tracking with typed received-index state
//! - Ordered assembly of complete sessions into published artifacts
//! - Time-based eviction of abandoned sessions

mod assembler;
mod chunks;
mod session;

pub use assembler::{Assembler, MergeOutcome, MergeRequest};
pub use chunks::ChunkStore;
pub use session::{ChunkOutcome, ChunkSubmission, UploadSession, UploadTracker};
