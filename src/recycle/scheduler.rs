//! Background purge of expired recycle bin entries.

use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{info, warn};

use super::service::RecycleBin;
use crate::config::RecycleConfig;
use crate::db::Database;
use crate::file::FileStorage;
use crate::Result;

/// Interval used when `clean_every_minute` is set.
pub const MINUTE_INTERVAL_SECS: u64 = 60;

/// Time from `now` until the next `hour:minute` UTC.
///
/// A time equal to `now` is scheduled for the following day.
pub fn next_run_delay(now: DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let fallback = Duration::from_secs(24 * 60 * 60);
    let Some(today) = now.date_naive().and_hms_opt(hour, minute, 0) else {
        return fallback;
    };

    let mut next = today.and_utc();
    if next <= now {
        next = match next.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => return fallback,
        };
    }
    (next - now).to_std().unwrap_or(fallback)
}

/// Periodically purges files whose retention window has passed.
pub struct RecycleCleaner {
    db: Arc<Database>,
    storage: Arc<FileStorage>,
    config: RecycleConfig,
}

impl RecycleCleaner {
    /// Create a new RecycleCleaner.
    pub fn new(db: Arc<Database>, storage: Arc<FileStorage>, config: RecycleConfig) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    /// Run one purge pass.
    pub async fn run_once(&self) -> Result<u64> {
        RecycleBin::new(self.db.pool(), &self.storage)
            .purge_expired(Utc::now(), self.config.retention())
            .await
    }

    async fn purge(&self) {
        if let Err(e) = self.run_once().await {
            warn!(error = %e, "Failed to purge recycle bin");
        }
    }

    /// Run the cleaner loop forever.
    pub async fn run(&self) {
        if self.config.clean_every_minute {
            info!("Recycle bin cleaner started (every minute)");
            let mut timer = interval(Duration::from_secs(MINUTE_INTERVAL_SECS));
            // Skip the immediate first tick.
            timer.tick().await;
            loop {
                timer.tick().await;
                self.purge().await;
            }
        }

        info!(
            "Recycle bin cleaner started (daily at {:02}:{:02} UTC)",
            self.config.clean_hour, self.config.clean_minute
        );
        loop {
            sleep(next_run_delay(
                Utc::now(),
                self.config.clean_hour,
                self.config.clean_minute,
            ))
            .await;
            self.purge().await;
        }
    }

    /// Spawn the cleaner on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
