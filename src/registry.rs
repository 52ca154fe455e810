//! Async access to the record registry.
//!
//! SQLite calls block, so they run on the blocking pool.

use rusqlite::Connection;
use streamdrop_common::{Error, Result};
use streamdrop_db::pool::{get_conn, DbPool};

/// Run `f` with a pooled connection on the blocking thread pool.
pub async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = get_conn(&pool)?;
        f(&*conn)
    })
    .await
    .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
}
