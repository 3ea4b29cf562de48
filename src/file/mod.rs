//! Hierarchy store: folders, file metadata and blob storage.
//!
//! Folders and files form one tree per owner. Files are soft-deleted into
//! the recycle bin; blobs live on disk under sharded directories.

mod folder;
mod metadata;
mod service;
mod storage;

pub use folder::{Folder, FolderRepository, FolderUpdate, NewFolder};
pub use metadata::{file_extension, FileRecord, FileRepository, FileStatus, NewFile};
pub use service::{
    DeleteSummary, DriveService, FolderListing, UploadLimits, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_QUOTA_BYTES,
};
pub use storage::{checksum, FileStorage, StoredBlob};
