use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{db::traits::SyncDatabaseError, db_types::BackfillJob};

pub async fn insert_job(
    merchant_id: &str,
    order_count: i64,
    conn: &mut SqliteConnection,
) -> Result<BackfillJob, SyncDatabaseError> {
    let job = sqlx::query_as(
        "INSERT INTO backfill_jobs (merchant_id, order_count, created_at) VALUES (?1, ?2, ?3) RETURNING *",
    )
    .bind(merchant_id)
    .bind(order_count)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(job)
}

pub async fn fetch_unfinished_jobs(conn: &mut SqliteConnection) -> Result<Vec<BackfillJob>, SyncDatabaseError> {
    let jobs = sqlx::query_as("SELECT * FROM backfill_jobs WHERE completed_at IS NULL ORDER BY id ASC")
        .fetch_all(conn)
        .await?;
    Ok(jobs)
}

pub async fn complete_job(id: i64, conn: &mut SqliteConnection) -> Result<(), SyncDatabaseError> {
    sqlx::query("UPDATE backfill_jobs SET completed_at = ?1 WHERE id = ?2 AND completed_at IS NULL")
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
