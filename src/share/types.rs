//! Share types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Access level granted by a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Read-only access.
    #[default]
    View,
    /// Read and write access.
    Edit,
}

impl Permission {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Edit => "edit",
        }
    }

    /// Check if this permission satisfies `needed`.
    pub fn allows(&self, needed: Permission) -> bool {
        *self >= needed
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(Permission::View),
            "edit" => Ok(Permission::Edit),
            _ => Err(format!("unknown permission: {s}")),
        }
    }
}

/// A node of the hierarchy that can be shared, starred or checked for access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareTarget {
    /// A file by ID.
    File(i64),
    /// A folder by ID.
    Folder(i64),
}

impl ShareTarget {
    /// Build a target from an optional file/folder ID pair.
    ///
    /// Exactly one of the two must be set.
    pub fn from_ids(file_id: Option<i64>, folder_id: Option<i64>) -> Option<Self> {
        match (file_id, folder_id) {
            (Some(id), None) => Some(ShareTarget::File(id)),
            (None, Some(id)) => Some(ShareTarget::Folder(id)),
            _ => None,
        }
    }

    /// The file ID, if this targets a file.
    pub fn file_id(&self) -> Option<i64> {
        match self {
            ShareTarget::File(id) => Some(*id),
            ShareTarget::Folder(_) => None,
        }
    }

    /// The folder ID, if this targets a folder.
    pub fn folder_id(&self) -> Option<i64> {
        match self {
            ShareTarget::File(_) => None,
            ShareTarget::Folder(id) => Some(*id),
        }
    }

    /// Resource type name ("file" or "folder").
    pub fn kind(&self) -> &'static str {
        match self {
            ShareTarget::File(_) => "file",
            ShareTarget::Folder(_) => "folder",
        }
    }

    /// The target's ID.
    pub fn id(&self) -> i64 {
        match self {
            ShareTarget::File(id) | ShareTarget::Folder(id) => *id,
        }
    }
}

/// A share row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Share {
    /// Share ID.
    pub id: i64,
    /// Shared file (set when sharing a file).
    pub file_id: Option<i64>,
    /// Shared folder (set when sharing a folder).
    pub folder_id: Option<i64>,
    /// Opaque URL-safe token.
    pub token: String,
    /// Stored permission ("view" or "edit").
    pub permission: String,
    /// Whether anyone with the link may view.
    pub is_public: bool,
    /// User who created the share.
    pub created_by: i64,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl Share {
    /// Get the shared node.
    pub fn target(&self) -> Option<ShareTarget> {
        ShareTarget::from_ids(self.file_id, self.folder_id)
    }

    /// Get the permission as enum. Unknown values read as `View`.
    pub fn permission(&self) -> Permission {
        self.permission.parse().unwrap_or(Permission::View)
    }
}

/// Data for creating a share.
#[derive(Debug, Clone)]
pub struct NewShare {
    /// Node to share.
    pub target: ShareTarget,
    /// Permission granted.
    pub permission: Permission,
    /// Public link share.
    pub is_public: bool,
    /// Emails of users to grant access to.
    pub emails: Vec<String>,
}

impl NewShare {
    /// Create a user-scoped view share.
    pub fn new(target: ShareTarget) -> Self {
        Self {
            target,
            permission: Permission::View,
            is_public: false,
            emails: Vec::new(),
        }
    }

    /// Set the permission.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Make the share public.
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Set the emails to grant access to.
    pub fn with_emails(mut self, emails: Vec<String>) -> Self {
        self.emails = emails;
        self
    }
}

/// Changes to an existing share.
#[derive(Debug, Clone, Default)]
pub struct ShareUpdate {
    /// New permission.
    pub permission: Option<Permission>,
    /// New public flag.
    pub is_public: Option<bool>,
    /// Replacement access list.
    pub emails: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(Permission::Edit.allows(Permission::View));
        assert!(Permission::Edit.allows(Permission::Edit));
        assert!(Permission::View.allows(Permission::View));
        assert!(!Permission::View.allows(Permission::Edit));
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("view".parse::<Permission>().unwrap(), Permission::View);
        assert_eq!(" EDIT ".parse::<Permission>().unwrap(), Permission::Edit);
        assert!("owner".parse::<Permission>().is_err());
    }

    #[test]
    fn test_permission_serde() {
        let json = serde_json::to_string(&Permission::Edit).unwrap();
        assert_eq!(json, "\"edit\"");
        let parsed: Permission = serde_json::from_str("\"view\"").unwrap();
        assert_eq!(parsed, Permission::View);
    }

    #[test]
    fn test_share_target_from_ids() {
        assert_eq!(ShareTarget::from_ids(Some(1), None), Some(ShareTarget::File(1)));
        assert_eq!(ShareTarget::from_ids(None, Some(2)), Some(ShareTarget::Folder(2)));
        assert_eq!(ShareTarget::from_ids(Some(1), Some(2)), None);
        assert_eq!(ShareTarget::from_ids(None, None), None);
        assert_eq!(ShareTarget::Folder(2).kind(), "folder");
        assert_eq!(ShareTarget::File(9).id(), 9);
    }
}
