//! Activity log.
//!
//! An append-only record of what each user did, with filtered listing,
//! CSV export and a view of destructive and share-changing actions.

mod export;
mod repository;
mod types;

pub use export::{csv_field, export_csv, export_filename, CSV_HEADER};
pub use repository::{
    ActivityRepository, Page, DEFAULT_LIMIT, DEFAULT_SECURITY_LIMIT, MAX_LIMIT,
    MAX_SECURITY_LIMIT,
};
pub use types::{Action, ActivityFilter, ActivityLog, NewActivity, ResourceType, SECURITY_ACTIONS};
