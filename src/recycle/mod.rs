//! Recycle bin.
//!
//! Deleted files keep their blob and their bytes stay charged to the owner
//! until they are restored, permanently deleted or purged after the
//! retention window.

mod scheduler;
mod service;

pub use scheduler::{next_run_delay, RecycleCleaner, MINUTE_INTERVAL_SECS};
pub use service::{RecycleBin, RestoreSummary};
