//! Permission resolution over the folder tree.
//!
//! Access to a node is decided by walking from the node up to the owner's
//! root. At each step the owner is granted everything, a public share grants
//! `view`, and a user share listing the caller grants its permission.

use std::collections::HashSet;

use sqlx::SqliteConnection;

use super::types::{Permission, ShareTarget};
use crate::{DriveError, Result};

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Access granted. Carries the owner of the checked node.
    Granted {
        /// Owner of the node.
        owner_id: i64,
    },
    /// The node exists but the caller may not use it this way.
    Denied,
    /// No such node (or a file sitting in the recycle bin).
    Missing,
}

/// Decide whether one share grants `needed` to a caller.
///
/// `listed` says whether the caller is on the share's access list.
pub fn share_grants(needed: Permission, permission: Permission, is_public: bool, listed: bool) -> bool {
    if is_public && needed == Permission::View {
        return true;
    }
    listed && permission.allows(needed)
}

#[derive(sqlx::FromRow)]
struct NodeRow {
    owner_id: i64,
    parent_id: Option<i64>,
}

async fn load_node(conn: &mut SqliteConnection, target: ShareTarget) -> Result<Option<NodeRow>> {
    let sql = match target {
        ShareTarget::File(_) => {
            "SELECT owner_id, folder_id AS parent_id FROM files WHERE id = ? AND status = 'live'"
        }
        ShareTarget::Folder(_) => "SELECT owner_id, parent_id FROM folders WHERE id = ?",
    };
    let row = sqlx::query_as::<_, NodeRow>(sql)
        .bind(target.id())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;
    Ok(row)
}

async fn shares_grant(
    conn: &mut SqliteConnection,
    user_id: i64,
    target: ShareTarget,
    needed: Permission,
) -> Result<bool> {
    let sql = match target {
        ShareTarget::File(_) => {
            "SELECT s.permission, s.is_public,
                    EXISTS(SELECT 1 FROM share_access a WHERE a.share_id = s.id AND a.user_id = ?)
             FROM shares s WHERE s.file_id = ?"
        }
        ShareTarget::Folder(_) => {
            "SELECT s.permission, s.is_public,
                    EXISTS(SELECT 1 FROM share_access a WHERE a.share_id = s.id AND a.user_id = ?)
             FROM shares s WHERE s.folder_id = ?"
        }
    };
    let rows: Vec<(String, bool, bool)> = sqlx::query_as(sql)
        .bind(user_id)
        .bind(target.id())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

    Ok(rows.into_iter().any(|(permission, is_public, listed)| {
        let permission = permission.parse().unwrap_or(Permission::View);
        share_grants(needed, permission, is_public, listed)
    }))
}

/// Check whether `user_id` may use `target` with `needed` permission.
pub async fn check_access(
    conn: &mut SqliteConnection,
    user_id: i64,
    target: ShareTarget,
    needed: Permission,
) -> Result<Access> {
    let Some(node) = load_node(conn, target).await? else {
        return Ok(Access::Missing);
    };
    let owner_id = node.owner_id;

    if owner_id == user_id || shares_grant(conn, user_id, target, needed).await? {
        return Ok(Access::Granted { owner_id });
    }

    let mut visited = HashSet::new();
    let mut parent = node.parent_id;
    while let Some(folder_id) = parent {
        if !visited.insert(folder_id) {
            break;
        }
        let folder = ShareTarget::Folder(folder_id);
        let Some(ancestor) = load_node(conn, folder).await? else {
            break;
        };
        if ancestor.owner_id == user_id || shares_grant(conn, user_id, folder, needed).await? {
            return Ok(Access::Granted { owner_id });
        }
        parent = ancestor.parent_id;
    }

    Ok(Access::Denied)
}

/// Like [`check_access`], but turns a refusal into an error.
///
/// Returns the owner of the node. Missing nodes become `NotFound`, denied
/// access becomes `Permission`.
pub async fn require_access(
    conn: &mut SqliteConnection,
    user_id: i64,
    target: ShareTarget,
    needed: Permission,
) -> Result<i64> {
    match check_access(conn, user_id, target, needed).await? {
        Access::Granted { owner_id } => Ok(owner_id),
        Access::Denied => Err(DriveError::Permission(format!(
            "{} access to {} {} required",
            needed,
            target.kind(),
            target.id()
        ))),
        Access::Missing => Err(DriveError::NotFound(target.kind().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn test_share_grants_table() {
        use Permission::{Edit, View};
        // Public shares grant view to anyone, never edit.
        assert!(share_grants(View, View, true, false));
        assert!(!share_grants(Edit, View, true, false));
        // User shares only grant to listed users.
        assert!(share_grants(View, View, false, true));
        assert!(share_grants(View, Edit, false, true));
        assert!(share_grants(Edit, Edit, false, true));
        assert!(!share_grants(Edit, View, false, true));
        assert!(!share_grants(View, Edit, false, false));
    }

    async fn exec(db: &Database, sql: &str) {
        sqlx::raw_sql(sql).execute(db.pool()).await.unwrap();
    }

    async fn setup() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        exec(
            &db,
            "INSERT INTO users (id, username, email, password) VALUES
                (1, 'owner', 'o@x.io', 'h'), (2, 'friend', 'f@x.io', 'h'), (3, 'stranger', 's@x.io', 'h');
             INSERT INTO folders (id, name, parent_id, owner_id) VALUES
                (1, 'Projects', NULL, 1), (2, 'Alpha', 1, 1), (3, 'Deep', 2, 1);
             INSERT INTO files (id, name, folder_id, owner_id, stored_name, size, checksum) VALUES
                (1, 'plan.txt', 3, 1, 'aa.txt', 10, 'x');
             INSERT INTO files (id, name, folder_id, owner_id, stored_name, size, checksum, status) VALUES
                (2, 'old.txt', 3, 1, 'bb.txt', 10, 'x', 'deleted');",
        )
        .await;
        db
    }

    async fn check(db: &Database, user: i64, target: ShareTarget, needed: Permission) -> Access {
        let mut conn = db.pool().acquire().await.unwrap();
        check_access(&mut conn, user, target, needed).await.unwrap()
    }

    #[tokio::test]
    async fn test_owner_has_full_access() {
        let db = setup().await;
        let granted = Access::Granted { owner_id: 1 };
        assert_eq!(check(&db, 1, ShareTarget::File(1), Permission::Edit).await, granted);
        assert_eq!(check(&db, 1, ShareTarget::Folder(3), Permission::Edit).await, granted);
    }

    #[tokio::test]
    async fn test_stranger_denied_and_missing() {
        let db = setup().await;
        assert_eq!(check(&db, 3, ShareTarget::File(1), Permission::View).await, Access::Denied);
        assert_eq!(check(&db, 3, ShareTarget::Folder(99), Permission::View).await, Access::Missing);
        // Recycled files are invisible even to the owner.
        assert_eq!(check(&db, 1, ShareTarget::File(2), Permission::View).await, Access::Missing);
    }

    #[tokio::test]
    async fn test_user_share_inherited_by_descendants() {
        let db = setup().await;
        exec(
            &db,
            "INSERT INTO shares (id, folder_id, token, permission, is_public, created_by)
                VALUES (1, 1, 'tok1', 'view', 0, 1);
             INSERT INTO share_access (share_id, user_id) VALUES (1, 2);",
        )
        .await;

        let granted = Access::Granted { owner_id: 1 };
        assert_eq!(check(&db, 2, ShareTarget::File(1), Permission::View).await, granted);
        assert_eq!(check(&db, 2, ShareTarget::Folder(3), Permission::View).await, granted);
        assert_eq!(check(&db, 2, ShareTarget::File(1), Permission::Edit).await, Access::Denied);
        assert_eq!(check(&db, 3, ShareTarget::File(1), Permission::View).await, Access::Denied);
    }

    #[tokio::test]
    async fn test_edit_share_on_intermediate_folder() {
        let db = setup().await;
        exec(
            &db,
            "INSERT INTO shares (id, folder_id, token, permission, is_public, created_by)
                VALUES (1, 2, 'tok1', 'edit', 0, 1);
             INSERT INTO share_access (share_id, user_id) VALUES (1, 2);",
        )
        .await;

        let granted = Access::Granted { owner_id: 1 };
        assert_eq!(check(&db, 2, ShareTarget::Folder(3), Permission::Edit).await, granted);
        assert_eq!(check(&db, 2, ShareTarget::Folder(2), Permission::Edit).await, granted);
        // Sharing a child does not open up the parent.
        assert_eq!(check(&db, 2, ShareTarget::Folder(1), Permission::View).await, Access::Denied);
    }

    #[tokio::test]
    async fn test_public_share_grants_view_only() {
        let db = setup().await;
        exec(
            &db,
            "INSERT INTO shares (id, file_id, token, permission, is_public, created_by)
                VALUES (1, 1, 'tok1', 'view', 1, 1);",
        )
        .await;

        let granted = Access::Granted { owner_id: 1 };
        assert_eq!(check(&db, 3, ShareTarget::File(1), Permission::View).await, granted);
        assert_eq!(check(&db, 3, ShareTarget::File(1), Permission::Edit).await, Access::Denied);
    }

    #[tokio::test]
    async fn test_require_access_errors() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let denied = require_access(&mut conn, 3, ShareTarget::Folder(1), Permission::View).await;
        assert!(matches!(denied, Err(DriveError::Permission(_))));

        let missing = require_access(&mut conn, 3, ShareTarget::File(42), Permission::View).await;
        assert!(matches!(missing, Err(DriveError::NotFound(_))));

        let owner = require_access(&mut conn, 1, ShareTarget::Folder(2), Permission::Edit)
            .await
            .unwrap();
        assert_eq!(owner, 1);
    }
}
