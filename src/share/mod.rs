//! Share registry.
//!
//! Shares grant `view` or `edit` access to a file or folder, either to
//! anyone holding the link (view only) or to a list of users. Access is
//! inherited by everything below a shared folder.

mod access;
mod repository;
mod service;
mod types;

pub use access::{check_access, require_access, share_grants, Access};
pub use repository::{generate_token, ShareRepository, ShareUser, SharedItem, TOKEN_LENGTH};
pub use service::{ResolvedShare, SavedShare, ShareDetails, ShareService, SharedResource};
pub use types::{NewShare, Permission, Share, ShareTarget, ShareUpdate};
