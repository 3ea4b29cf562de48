//! Activity log types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A user action worth recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Login,
    ChangePassword,
    CreateFolder,
    RenameFolder,
    MoveFolder,
    DeleteFolder,
    UploadFile,
    DownloadFile,
    RenameFile,
    MoveFile,
    DeleteFile,
    RestoreFile,
    PermanentDelete,
    CreateShare,
    UpdateShare,
    DeleteShare,
}

/// Destructive and share-changing actions.
pub const SECURITY_ACTIONS: [Action; 6] = [
    Action::DeleteFile,
    Action::DeleteFolder,
    Action::PermanentDelete,
    Action::CreateShare,
    Action::UpdateShare,
    Action::DeleteShare,
];

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 16] = [
        Action::Login,
        Action::ChangePassword,
        Action::CreateFolder,
        Action::RenameFolder,
        Action::MoveFolder,
        Action::DeleteFolder,
        Action::UploadFile,
        Action::DownloadFile,
        Action::RenameFile,
        Action::MoveFile,
        Action::DeleteFile,
        Action::RestoreFile,
        Action::PermanentDelete,
        Action::CreateShare,
        Action::UpdateShare,
        Action::DeleteShare,
    ];

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::ChangePassword => "change_password",
            Action::CreateFolder => "create_folder",
            Action::RenameFolder => "rename_folder",
            Action::MoveFolder => "move_folder",
            Action::DeleteFolder => "delete_folder",
            Action::UploadFile => "upload_file",
            Action::DownloadFile => "download_file",
            Action::RenameFile => "rename_file",
            Action::MoveFile => "move_file",
            Action::DeleteFile => "delete_file",
            Action::RestoreFile => "restore_file",
            Action::PermanentDelete => "permanent_delete",
            Action::CreateShare => "create_share",
            Action::UpdateShare => "update_share",
            Action::DeleteShare => "delete_share",
        }
    }

    /// Check if this action shows up in security highlights.
    pub fn is_security(&self) -> bool {
        SECURITY_ACTIONS.contains(self)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// Kind of resource an action touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Folder,
    Share,
    User,
}

impl ResourceType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::File => "file",
            ResourceType::Folder => "folder",
            ResourceType::Share => "share",
            ResourceType::User => "user",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "file" => Ok(ResourceType::File),
            "folder" => Ok(ResourceType::Folder),
            "share" => Ok(ResourceType::Share),
            "user" => Ok(ResourceType::User),
            other => Err(format!("unknown resource type: {other}")),
        }
    }
}

/// A stored log entry joined with the acting user's name.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

/// Data for a new log entry.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: i64,
    pub action: Action,
    pub resource_type: ResourceType,
    pub resource_id: Option<i64>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl NewActivity {
    /// Create an entry without resource, details or address.
    pub fn new(user_id: i64, action: Action, resource_type: ResourceType) -> Self {
        Self {
            user_id,
            action,
            resource_type,
            resource_id: None,
            details: None,
            ip_address: None,
        }
    }

    /// Set the resource ID.
    pub fn resource(mut self, id: i64) -> Self {
        self.resource_id = Some(id);
        self
    }

    /// Set free-form details.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the client address.
    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}

/// Filters for listing and exporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub action: Option<Action>,
    pub resource_type: Option<ResourceType>,
    /// First day included.
    pub start_date: Option<NaiveDate>,
    /// Last day included.
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip_names() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("format_disk".parse::<Action>().is_err());
    }

    #[test]
    fn test_action_serde_matches_db_name() {
        let json = serde_json::to_string(&Action::PermanentDelete).unwrap();
        assert_eq!(json, "\"permanent_delete\"");
    }

    #[test]
    fn test_security_actions() {
        assert!(Action::DeleteShare.is_security());
        assert!(Action::PermanentDelete.is_security());
        assert!(!Action::Login.is_security());
        assert!(!Action::UploadFile.is_security());
    }

    #[test]
    fn test_resource_type_parse() {
        assert_eq!("folder".parse::<ResourceType>().unwrap(), ResourceType::Folder);
        assert!("board".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_new_activity_builder() {
        let entry = NewActivity::new(3, Action::RenameFile, ResourceType::File)
            .resource(9)
            .details("a.txt -> b.txt")
            .ip(Some("10.0.0.1".to_string()));
        assert_eq!(entry.resource_id, Some(9));
        assert_eq!(entry.details.as_deref(), Some("a.txt -> b.txt"));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
    }
}
