//! Database schema and migrations for hoard.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Initial schema - folders and files
    r#"
-- Folder records mirror real directories under the storage root
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    path        TEXT NOT NULL UNIQUE,            -- storage-relative path
    parent_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,  -- NULL for root-level folders
    owner_id    INTEGER,                         -- NULL for orphan records created by the scanner
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_folders_parent_id ON folders(parent_id);
CREATE INDEX idx_folders_owner_id ON folders(owner_id);

-- File records mirror real files at their exact storage-relative path
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    filename    TEXT NOT NULL,
    path        TEXT NOT NULL UNIQUE,            -- storage-relative path
    size        INTEGER NOT NULL,                -- bytes
    mime_type   TEXT NOT NULL DEFAULT 'application/octet-stream',
    folder_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,  -- NULL = storage root
    owner_id    INTEGER,                         -- NULL for orphan records created by the scanner
    is_public   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_folder_id ON files(folder_id);
CREATE INDEX idx_files_owner_id ON files(owner_id);
"#,
];
