//! Expiry sweeper.
//!
//! Runs one cycle at startup and then on a fixed interval. Each cycle lists
//! expired record IDs, removes the local blob directory for each (remote
//! records have nothing stored locally) and then the registry row. A failure
//! on one record is logged and never stops the rest of the cycle. A row whose
//! bytes could not be removed is kept, so the next cycle retries both.

use std::time::Duration;

use chrono::{DateTime, Utc};
use streamdrop_common::{Error, Result};
use streamdrop_db::pool::DbPool;
use streamdrop_db::queries::files;
use tokio_util::sync::CancellationToken;

use crate::registry::with_conn;
use crate::storage::LocalStore;

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired records found.
    pub scanned: usize,
    /// Registry rows removed.
    pub deleted: usize,
    /// Blob deletions that failed.
    pub blob_failures: usize,
    /// Registry deletions that failed.
    pub record_failures: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.blob_failures == 0 && self.record_failures == 0
    }
}

/// Removes expired records and their bytes.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    db: DbPool,
    store: LocalStore,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(db: DbPool, store: LocalStore, interval: Duration) -> Self {
        Self {
            db,
            store,
            interval,
        }
    }

    /// Run until `cancel` fires. The first cycle starts immediately.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancel.cancelled() => { break; }
            }

            match self.sweep_once(Utc::now()).await {
                Ok(report) if report.scanned == 0 => {
                    tracing::debug!("No expired files to clean up");
                }
                Ok(report) => {
                    tracing::info!(
                        scanned = report.scanned,
                        deleted = report.deleted,
                        blob_failures = report.blob_failures,
                        record_failures = report.record_failures,
                        "Sweep cycle finished"
                    );
                }
                Err(e) => {
                    tracing::error!("Sweep cycle failed: {e}");
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    }

    /// Run a single cycle treating `now` as the current time.
    ///
    /// Only a failure to list expired records is returned as an error;
    /// per-record failures are counted in the report.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let ids = with_conn(&self.db, move |conn| files::list_expired_ids(conn, now)).await?;

        let mut report = SweepReport {
            scanned: ids.len(),
            ..SweepReport::default()
        };

        for id in ids {
            if let Err(e) = self.remove_blob(&id).await {
                report.blob_failures += 1;
                tracing::warn!(
                    id = %id,
                    error = %e,
                    "Failed to delete stored file, keeping record for the next cycle"
                );
                continue;
            }

            let key = id.clone();
            match with_conn(&self.db, move |conn| files::delete_file(conn, &key)).await {
                Ok(_) => {
                    report.deleted += 1;
                    tracing::info!(id = %id, "Deleted expired file");
                }
                Err(e) => {
                    report.record_failures += 1;
                    tracing::error!(id = %id, error = %e, "Failed to delete expired record");
                }
            }
        }

        Ok(report)
    }

    async fn remove_blob(&self, id: &str) -> Result<()> {
        let key = id.to_string();
        match with_conn(&self.db, move |conn| files::get_file(conn, &key)).await {
            Ok(record) if record.origin.is_remote() => Ok(()),
            Ok(_) => self.store.delete_all(id).await,
            // Already removed by a concurrent sweep.
            Err(Error::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    id = %id,
                    error = %e,
                    "Unreadable expired record, removing its directory"
                );
                self.store.delete_all(id).await
            }
        }
    }
}
