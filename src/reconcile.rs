//! Filesystem/metadata reconciliation for hoard.
//!
//! Walks the physical storage tree and fills the gaps in the catalog:
//! directories without a folder record and files without a file record
//! get orphan records (no owner) that a collaborator can attribute
//! later. Matched records are never mutated or deleted; this sync is
//! deliberately one-directional.
//!
//! The walk uses an explicit work stack instead of call-stack recursion,
//! and a parent directory's record is always resolved before its
//! children are visited, so child records never reference a missing
//! parent.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::{FileRepository, FolderRepository, NewFileRecord, NewFolderRecord};
use crate::storage::StorageRoot;
use crate::upload::ChunkStore;
use crate::{Database, HoardError, Result};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Folder records created for directories that had none.
    pub folders_created: usize,
    /// File records created for files that had none.
    pub files_created: usize,
    /// Entries skipped because they could not be read or classified.
    pub entries_skipped: usize,
}

/// Scanner bringing the catalog into agreement with the physical tree.
pub struct Reconciler {
    db: Arc<Database>,
    root: StorageRoot,
}

/// One pending directory on the work stack: its storage-relative path
/// (empty string for the root) and the record id of the directory itself
/// (None for the root).
struct PendingDir {
    rel: String,
    folder_id: Option<i64>,
}

impl Reconciler {
    /// Create a new Reconciler.
    pub fn new(db: Arc<Database>, root: StorageRoot) -> Self {
        Self { db, root }
    }

    /// Walk the storage tree depth-first and create missing records.
    ///
    /// Unreadable entries are logged and skipped; the pass always covers
    /// the rest of the tree. Chunk staging files are ignored entirely.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let folders = FolderRepository::new(self.db.pool());
        let files = FileRepository::new(self.db.pool());

        let mut report = ReconcileReport::default();
        let mut stack = vec![PendingDir {
            rel: String::new(),
            folder_id: None,
        }];

        while let Some(dir) = stack.pop() {
            let abs = if dir.rel.is_empty() {
                self.root.base_path().to_path_buf()
            } else {
                self.root.absolute(&dir.rel)
            };

            let mut entries = match tokio::fs::read_dir(&abs).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %abs.display(), error = %e, "skipping unreadable directory");
                    report.entries_skipped += 1;
                    continue;
                }
            };

            let mut names: Vec<(String, bool)> = Vec::new();
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                            warn!(path = %entry.path().display(), "skipping non-UTF-8 entry name");
                            report.entries_skipped += 1;
                            continue;
                        };
                        match entry.file_type().await {
                            Ok(ft) if ft.is_dir() => names.push((name, true)),
                            Ok(ft) if ft.is_file() => names.push((name, false)),
                            Ok(_) => {
                                // Symlinks and specials are outside the
                                // mirrored tree model.
                                report.entries_skipped += 1;
                            }
                            Err(e) => {
                                warn!(path = %entry.path().display(), error = %e, "skipping unreadable entry");
                                report.entries_skipped += 1;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(path = %abs.display(), error = %e, "directory read aborted");
                        report.entries_skipped += 1;
                        break;
                    }
                }
            }
            names.sort();

            // Depth-first in name order: entries are pushed in reverse so
            // the first child is processed next.
            let mut pending_children = Vec::new();

            for (name, is_dir) in names {
                let rel = if dir.rel.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", dir.rel, name)
                };

                if is_dir {
                    let folder_id = match self.resolve_folder(&folders, &name, &rel, dir.folder_id).await {
                        Ok((id, created)) => {
                            if created {
                                report.folders_created += 1;
                            }
                            id
                        }
                        Err(e) => {
                            warn!(path = %rel, error = %e, "skipping directory");
                            report.entries_skipped += 1;
                            continue;
                        }
                    };
                    pending_children.push(PendingDir {
                        rel,
                        folder_id: Some(folder_id),
                    });
                } else {
                    if ChunkStore::is_chunk_file(&name) {
                        continue;
                    }
                    match self.resolve_file(&files, &name, &rel, dir.folder_id).await {
                        Ok(created) => {
                            if created {
                                report.files_created += 1;
                            }
                        }
                        Err(e) => {
                            warn!(path = %rel, error = %e, "skipping file");
                            report.entries_skipped += 1;
                        }
                    }
                }
            }

            for child in pending_children.into_iter().rev() {
                stack.push(child);
            }
        }

        info!(
            folders_created = report.folders_created,
            files_created = report.files_created,
            entries_skipped = report.entries_skipped,
            "reconcile pass complete"
        );

        Ok(report)
    }

    /// Find or create the folder record for a directory.
    ///
    /// Returns the record id and whether a record was created.
    async fn resolve_folder(
        &self,
        folders: &FolderRepository<'_>,
        name: &str,
        rel: &str,
        parent_id: Option<i64>,
    ) -> Result<(i64, bool)> {
        if let Some(existing) = folders.get_by_path(rel).await? {
            return Ok((existing.id, false));
        }

        let mut new_folder = NewFolderRecord::new(name, rel);
        new_folder.parent_id = parent_id;

        match folders.create(&new_folder).await {
            Ok(record) => Ok((record.id, true)),
            // A concurrent writer may have published the record between
            // the lookup and the insert; theirs wins.
            Err(HoardError::PathConflict(_)) => match folders.get_by_path(rel).await? {
                Some(existing) => Ok((existing.id, false)),
                None => Err(HoardError::PathConflict(rel.to_string())),
            },
            Err(e) => Err(e),
        }
    }

    /// Create the file record for a file when none exists.
    ///
    /// Returns whether a record was created. Existing records are left
    /// untouched even when the on-disk size has drifted.
    async fn resolve_file(
        &self,
        files: &FileRepository<'_>,
        name: &str,
        rel: &str,
        folder_id: Option<i64>,
    ) -> Result<bool> {
        if files.get_by_path(rel).await?.is_some() {
            return Ok(false);
        }

        let size = self.root.file_size(rel).await?;
        let mut new_file = NewFileRecord::new(name, rel, size as i64);
        new_file.folder_id = folder_id;

        match files.create(&new_file).await {
            Ok(_) => Ok(true),
            Err(HoardError::PathConflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        db: Arc<Database>,
        root: StorageRoot,
        reconciler: Reconciler,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let root = StorageRoot::new(temp_dir.path()).unwrap();
        let reconciler = Reconciler::new(db.clone(), root.clone());
        Fixture {
            _temp_dir: temp_dir,
            db,
            root,
            reconciler,
        }
    }

    async fn place_file(root: &StorageRoot, rel: &str, content: &[u8]) {
        root.ensure_parent(rel).await.unwrap();
        tokio::fs::write(root.absolute(rel), content).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_empty_tree() {
        let f = setup().await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert_eq!(report, ReconcileReport::default());
    }

    #[tokio::test]
    async fn test_reconcile_creates_orphan_records() {
        let f = setup().await;

        place_file(&f.root, "docs/reports/q1.pdf", b"pdf bytes").await;
        place_file(&f.root, "notes.txt", b"hello").await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert_eq!(report.folders_created, 2);
        assert_eq!(report.files_created, 2);

        let folders = FolderRepository::new(f.db.pool());
        let docs = folders.get_by_path("docs").await.unwrap().unwrap();
        let reports = folders.get_by_path("docs/reports").await.unwrap().unwrap();

        // Orphans: no owner, parents chain up correctly.
        assert!(docs.owner_id.is_none());
        assert!(docs.parent_id.is_none());
        assert_eq!(reports.parent_id, Some(docs.id));

        let files = FileRepository::new(f.db.pool());
        let q1 = files.get_by_path("docs/reports/q1.pdf").await.unwrap().unwrap();
        assert_eq!(q1.folder_id, Some(reports.id));
        assert!(q1.owner_id.is_none());
        assert_eq!(q1.size, 9);
        assert_eq!(q1.mime_type, "application/pdf");

        let notes = files.get_by_path("notes.txt").await.unwrap().unwrap();
        assert!(notes.folder_id.is_none());
        assert_eq!(notes.mime_type, "text/plain");
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let f = setup().await;

        place_file(&f.root, "a/b/c.txt", b"x").await;

        let first = f.reconciler.reconcile().await.unwrap();
        assert_eq!(first.folders_created, 2);
        assert_eq!(first.files_created, 1);

        // Second pass over an unchanged tree converges to zero.
        let second = f.reconciler.reconcile().await.unwrap();
        assert_eq!(second.folders_created, 0);
        assert_eq!(second.files_created, 0);
    }

    #[tokio::test]
    async fn test_reconcile_never_mutates_matched_records() {
        let f = setup().await;

        place_file(&f.root, "a.txt", b"original").await;
        f.reconciler.reconcile().await.unwrap();

        let files = FileRepository::new(f.db.pool());
        let before = files.get_by_path("a.txt").await.unwrap().unwrap();

        // Drift the artifact out-of-band; the record must stay as-is.
        place_file(&f.root, "a.txt", b"much longer replacement content").await;
        f.reconciler.reconcile().await.unwrap();

        let after = files.get_by_path("a.txt").await.unwrap().unwrap();
        assert_eq!(after.size, before.size);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn test_reconcile_keeps_stale_records() {
        let f = setup().await;

        place_file(&f.root, "gone.txt", b"x").await;
        f.reconciler.reconcile().await.unwrap();
        f.root.remove_file("gone.txt").await.unwrap();

        f.reconciler.reconcile().await.unwrap();

        // One-directional healing: the record whose file vanished stays.
        let files = FileRepository::new(f.db.pool());
        assert!(files.get_by_path("gone.txt").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reconcile_skips_chunk_staging_files() {
        let f = setup().await;

        place_file(&f.root, "upload.bin.part0", b"staged").await;
        place_file(&f.root, "upload.bin.part1", b"staged").await;
        place_file(&f.root, "real.bin", b"done").await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert_eq!(report.files_created, 1);

        let files = FileRepository::new(f.db.pool());
        assert!(files.get_by_path("upload.bin.part0").await.unwrap().is_none());
        assert!(files.get_by_path("real.bin").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reconcile_adopts_preexisting_folder_records() {
        let f = setup().await;

        // The folder record exists (with an owner); only the file inside
        // is missing from the catalog.
        let folders = FolderRepository::new(f.db.pool());
        let docs = folders
            .create(&NewFolderRecord::new("docs", "docs").with_owner(5))
            .await
            .unwrap();

        place_file(&f.root, "docs/a.txt", b"x").await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert_eq!(report.folders_created, 0);
        assert_eq!(report.files_created, 1);

        let files = FileRepository::new(f.db.pool());
        let a = files.get_by_path("docs/a.txt").await.unwrap().unwrap();
        assert_eq!(a.folder_id, Some(docs.id));

        // The matched folder record kept its owner.
        let docs_after = folders.get_by_path("docs").await.unwrap().unwrap();
        assert_eq!(docs_after.owner_id, Some(5));
    }

    #[tokio::test]
    async fn test_reconcile_deep_tree() {
        let f = setup().await;

        // Deep nesting exercises the explicit work stack.
        let mut rel = String::from("d0");
        for i in 1..40 {
            rel = format!("{rel}/d{i}");
        }
        place_file(&f.root, &format!("{rel}/leaf.txt"), b"x").await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert_eq!(report.folders_created, 40);
        assert_eq!(report.files_created, 1);

        let files = FileRepository::new(f.db.pool());
        let leaf = files
            .get_by_path(&format!("{rel}/leaf.txt"))
            .await
            .unwrap()
            .unwrap();

        let folders = FolderRepository::new(f.db.pool());
        let deepest = folders.get_by_path(&rel).await.unwrap().unwrap();
        assert_eq!(leaf.folder_id, Some(deepest.id));
    }
}
