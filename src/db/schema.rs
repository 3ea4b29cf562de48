//! Database schema and migrations for driveshelf.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL,
    email         TEXT NOT NULL,
    password      TEXT NOT NULL,           -- Argon2 hash
    profile       TEXT,
    storage_used  INTEGER NOT NULL DEFAULT 0,  -- bytes, live + recycle bin
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_users_email_nocase ON users(email COLLATE NOCASE);
CREATE INDEX idx_users_username ON users(username);
"#,
    // v2: folder tree and files
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    parent_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,  -- NULL = root
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_folders_sibling_name
    ON folders(owner_id, COALESCE(parent_id, 0), name);
CREATE INDEX idx_folders_parent ON folders(parent_id);

CREATE TABLE files (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL,
    folder_id           INTEGER REFERENCES folders(id) ON DELETE SET NULL,  -- NULL = root
    owner_id            INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    stored_name         TEXT NOT NULL UNIQUE,
    size                INTEGER NOT NULL,
    checksum            TEXT NOT NULL,     -- SHA-256 hex
    status              TEXT NOT NULL DEFAULT 'live',  -- 'live', 'deleted'
    original_folder_id  INTEGER,           -- folder at deletion time
    deleted_at          TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_files_live_sibling_name
    ON files(owner_id, COALESCE(folder_id, 0), name) WHERE status = 'live';
CREATE INDEX idx_files_folder ON files(folder_id);
CREATE INDEX idx_files_owner_status ON files(owner_id, status);
"#,
    // v3: shares
    r#"
CREATE TABLE shares (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id     INTEGER REFERENCES files(id) ON DELETE CASCADE,
    folder_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    permission  TEXT NOT NULL DEFAULT 'view',  -- 'view', 'edit'
    is_public   INTEGER NOT NULL DEFAULT 0,
    created_by  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK ((file_id IS NULL) <> (folder_id IS NULL)),
    CHECK (is_public = 0 OR permission = 'view')
);

CREATE INDEX idx_shares_file ON shares(file_id);
CREATE INDEX idx_shares_folder ON shares(folder_id);

CREATE TABLE share_access (
    share_id  INTEGER NOT NULL REFERENCES shares(id) ON DELETE CASCADE,
    user_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (share_id, user_id)
);

CREATE INDEX idx_share_access_user ON share_access(user_id);
"#,
    // v4: activity log
    r#"
CREATE TABLE activity_logs (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    action         TEXT NOT NULL,
    resource_type  TEXT NOT NULL,  -- 'file', 'folder', 'share', 'user'
    resource_id    INTEGER,
    details        TEXT,
    ip_address     TEXT,
    created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_activity_logs_user_created ON activity_logs(user_id, created_at);
"#,
    // v5: stars
    r#"
CREATE TABLE starred (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    file_id     INTEGER REFERENCES files(id) ON DELETE CASCADE,
    folder_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK ((file_id IS NULL) <> (folder_id IS NULL)),
    UNIQUE (user_id, file_id),
    UNIQUE (user_id, folder_id)
);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert_eq!(MIGRATIONS.len(), 5);
        for migration in MIGRATIONS {
            assert!(!migration.trim().is_empty());
        }
    }
}
