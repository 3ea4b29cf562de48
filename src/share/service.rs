//! Share service: creating, updating and resolving shares.

use tracing::info;

use super::access::require_access;
use super::repository::{ShareRepository, SharedItem, ShareUser};
use super::types::{NewShare, Permission, Share, ShareTarget, ShareUpdate};
use crate::db::{DbPool, UserRepository};
use crate::file::{FileRecord, FileRepository, Folder, FolderRepository};
use crate::{DriveError, Result};

/// A share plus the emails that matched no account.
#[derive(Debug, Clone)]
pub struct SavedShare {
    /// The stored share.
    pub share: Share,
    /// Users on the access list.
    pub users: Vec<ShareUser>,
    /// Requested emails with no account behind them.
    pub unknown_emails: Vec<String>,
}

/// A share with its access list.
#[derive(Debug, Clone)]
pub struct ShareDetails {
    /// The share.
    pub share: Share,
    /// Users on the access list (empty for public shares).
    pub users: Vec<ShareUser>,
}

/// What a share token points at.
#[derive(Debug, Clone)]
pub enum SharedResource {
    /// A live file.
    File(FileRecord),
    /// A folder with its children.
    Folder {
        /// The shared folder.
        folder: Folder,
        /// Child folders.
        folders: Vec<Folder>,
        /// Live child files.
        files: Vec<FileRecord>,
    },
}

/// A resolved share token.
#[derive(Debug, Clone)]
pub struct ResolvedShare {
    /// The share.
    pub share: Share,
    /// The shared resource.
    pub resource: SharedResource,
}

fn check_public_view(permission: Permission, is_public: bool) -> Result<()> {
    if is_public && permission != Permission::View {
        return Err(DriveError::Validation(
            "public shares can only grant view access".to_string(),
        ));
    }
    Ok(())
}

/// Service for the share registry.
pub struct ShareService<'a> {
    pool: &'a DbPool,
}

impl<'a> ShareService<'a> {
    /// Create a new ShareService.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    async fn authorize(&self, user_id: i64, target: ShareTarget, needed: Permission) -> Result<i64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        require_access(&mut conn, user_id, target, needed).await
    }

    /// Resolve emails to user IDs, leaving out the node owner.
    async fn resolve_users(&self, emails: &[String], owner_id: i64) -> Result<(Vec<i64>, Vec<String>)> {
        let (users, unknown) = UserRepository::new(self.pool).resolve_emails(emails).await?;
        let ids = users
            .into_iter()
            .map(|u| u.id)
            .filter(|id| *id != owner_id)
            .collect();
        Ok((ids, unknown))
    }

    async fn saved(&self, id: i64, unknown_emails: Vec<String>) -> Result<SavedShare> {
        let repo = ShareRepository::new(self.pool);
        let share = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DriveError::NotFound("share".to_string()))?;
        let users = repo.access_users(id).await?;
        Ok(SavedShare {
            share,
            users,
            unknown_emails,
        })
    }

    /// Load a share and check the caller may manage it.
    async fn manageable(&self, user_id: i64, share_id: i64) -> Result<(Share, ShareTarget, i64)> {
        let share = ShareRepository::new(self.pool)
            .get_by_id(share_id)
            .await?
            .ok_or_else(|| DriveError::NotFound("share".to_string()))?;
        let target = share
            .target()
            .ok_or_else(|| DriveError::NotFound("share".to_string()))?;
        let owner_id = self.authorize(user_id, target, Permission::Edit).await?;
        Ok((share, target, owner_id))
    }

    /// Create a share. Needs edit access to the target.
    pub async fn create_share(&self, user_id: i64, new_share: NewShare) -> Result<SavedShare> {
        check_public_view(new_share.permission, new_share.is_public)?;
        let owner_id = self
            .authorize(user_id, new_share.target, Permission::Edit)
            .await?;

        let (user_ids, unknown) = if new_share.is_public {
            (Vec::new(), Vec::new())
        } else {
            self.resolve_users(&new_share.emails, owner_id).await?
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        let share = ShareRepository::insert(
            &mut tx,
            new_share.target,
            new_share.permission,
            new_share.is_public,
            user_id,
        )
        .await?;
        ShareRepository::replace_access(&mut tx, share.id, &user_ids).await?;
        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        info!(
            user_id,
            share_id = share.id,
            target = new_share.target.kind(),
            target_id = new_share.target.id(),
            is_public = new_share.is_public,
            "Share created"
        );
        self.saved(share.id, unknown).await
    }

    /// Every share on a node with its access list. Needs edit access.
    pub async fn share_details(&self, user_id: i64, target: ShareTarget) -> Result<Vec<ShareDetails>> {
        self.authorize(user_id, target, Permission::Edit).await?;

        let repo = ShareRepository::new(self.pool);
        let mut details = Vec::new();
        for share in repo.list_for_target(target).await? {
            let users = if share.is_public {
                Vec::new()
            } else {
                repo.access_users(share.id).await?
            };
            details.push(ShareDetails { share, users });
        }
        Ok(details)
    }

    /// Change a share's permission, public flag or access list.
    pub async fn update_share(&self, user_id: i64, share_id: i64, update: ShareUpdate) -> Result<SavedShare> {
        let (share, _, owner_id) = self.manageable(user_id, share_id).await?;

        let permission = update.permission.unwrap_or_else(|| share.permission());
        let is_public = update.is_public.unwrap_or(share.is_public);
        check_public_view(permission, is_public)?;

        let (access, unknown) = if is_public {
            (Some(Vec::new()), Vec::new())
        } else if let Some(emails) = &update.emails {
            let (ids, unknown) = self.resolve_users(emails, owner_id).await?;
            (Some(ids), unknown)
        } else {
            (None, Vec::new())
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        ShareRepository::update_flags(&mut tx, share_id, permission, is_public).await?;
        if let Some(user_ids) = &access {
            ShareRepository::replace_access(&mut tx, share_id, user_ids).await?;
        }
        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        info!(user_id, share_id, permission = %permission, is_public, "Share updated");
        self.saved(share_id, unknown).await
    }

    /// Delete a share. Needs edit access to its target.
    pub async fn delete_share(&self, user_id: i64, share_id: i64) -> Result<Share> {
        let (share, _, _) = self.manageable(user_id, share_id).await?;
        ShareRepository::new(self.pool).delete(share_id).await?;
        info!(user_id, share_id, "Share deleted");
        Ok(share)
    }

    /// Open a share by token.
    ///
    /// Public shares open for any authenticated user. User shares open for
    /// listed users, the node owner and the share's creator.
    pub async fn resolve_token(&self, user_id: i64, token: &str) -> Result<ResolvedShare> {
        let repo = ShareRepository::new(self.pool);
        let share = repo
            .get_by_token(token)
            .await?
            .ok_or_else(|| DriveError::NotFound("share".to_string()))?;
        let target = share
            .target()
            .ok_or_else(|| DriveError::NotFound("share".to_string()))?;

        let files = FileRepository::new(self.pool);
        let folders = FolderRepository::new(self.pool);
        let owner_id = match target {
            ShareTarget::File(id) => files.get_by_id(id).await?.map(|f| f.owner_id),
            ShareTarget::Folder(id) => folders.get_by_id(id).await?.map(|f| f.owner_id),
        }
        .ok_or_else(|| DriveError::NotFound("share".to_string()))?;

        let allowed = share.is_public
            || user_id == owner_id
            || user_id == share.created_by
            || repo.is_listed(share.id, user_id).await?;
        if !allowed {
            return Err(DriveError::Permission(
                "this share is not available to you".to_string(),
            ));
        }

        let resource = match target {
            ShareTarget::File(id) => {
                let file = files
                    .get_by_id(id)
                    .await?
                    .filter(|f| f.is_live())
                    .ok_or_else(|| DriveError::NotFound("file".to_string()))?;
                SharedResource::File(file)
            }
            ShareTarget::Folder(id) => {
                let folder = folders
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| DriveError::NotFound("folder".to_string()))?;
                SharedResource::Folder {
                    folders: folders.list_children(owner_id, Some(id)).await?,
                    files: files.list_live(owner_id, Some(id)).await?,
                    folder,
                }
            }
        };

        Ok(ResolvedShare { share, resource })
    }

    /// Nodes shared with the caller through user shares.
    pub async fn shared_with_me(&self, user_id: i64) -> Result<Vec<SharedItem>> {
        ShareRepository::new(self.pool).shared_with(user_id).await
    }
}
