use sqlx::{PgConnection, PgPool, Row};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::repo::VerificationRepo;
use crate::state::AppState;

/// Advisory lock id shared by every replica running the cleanup task
const CLEANUP_LOCK_ID: i64 = 48213;

/// Start background tasks with PostgreSQL Advisory Locks
pub fn start_background_tasks(state: AppState) {
    info!("Starting background tasks");

    // Expired verification tokens and SMS codes
    spawn_verification_cleanup_task(state);

    info!("All background tasks started");
}

/// Pause between cleanup cycles, never shorter than one second
pub fn cleanup_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

fn spawn_verification_cleanup_task(state: AppState) {
    tokio::spawn(async move {
        let interval = cleanup_interval(state.config.cleanup_interval_secs);

        info!(
            "Verification cleanup task started with interval {} seconds",
            interval.as_secs()
        );

        loop {
            match run_cleanup_cycle(&state.pool).await {
                Ok(Some(count)) => info!("Verification cleanup removed {} rows", count),
                Ok(None) => {
                    warn!("Could not acquire advisory lock for verification cleanup, skipping this cycle");
                }
                Err(e) => error!("Verification cleanup failed: {:?}", e),
            }

            tokio::time::sleep(interval).await;
        }
    });
}

/// One purge under the advisory lock. `None` when another replica holds it.
///
/// The lock is session scoped, so it is taken and released on the same
/// pooled connection.
async fn run_cleanup_cycle(pool: &PgPool) -> Result<Option<u64>, sqlx::Error> {
    let mut conn = pool.acquire().await?;

    if !try_acquire_lock(&mut conn, CLEANUP_LOCK_ID).await? {
        return Ok(None);
    }
    info!(
        "Acquired advisory lock for verification cleanup (lock_id={})",
        CLEANUP_LOCK_ID
    );

    let purged = VerificationRepo::new(pool.clone()).purge_expired().await;

    match release_lock(&mut conn, CLEANUP_LOCK_ID).await {
        Ok(true) => {}
        Ok(false) => warn!("Cleanup advisory lock was not held at release"),
        Err(e) => {
            error!("Failed to release cleanup advisory lock: {:?}", e);
            // Closing the session drops any lock still held on it
            drop(conn.detach());
        }
    }

    purged.map(Some)
}

/// Try to acquire PostgreSQL advisory lock
async fn try_acquire_lock(conn: &mut PgConnection, lock_id: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT pg_try_advisory_lock($1) as acquired")
        .bind(lock_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.get("acquired"))
}

/// Release PostgreSQL advisory lock. `false` when this session did not hold it.
async fn release_lock(conn: &mut PgConnection, lock_id: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT pg_advisory_unlock($1) as released")
        .bind(lock_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.get("released"))
}
