//! Database operations for `tracking_jobs`.
//!
//! Status transitions are guarded in SQL: each update only matches rows in
//! the expected source status, and zero affected rows is reported as an
//! invalid transition.

use chrono::{DateTime, Utc};
use pricewatch_core::{JobStatus, ScrapingJob};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `tracking_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackingJobRow {
    pub id: Uuid,
    pub product_url: String,
    pub status: String,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TrackingJobRow> for ScrapingJob {
    type Error = DbError;

    fn try_from(row: TrackingJobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status).ok_or_else(|| DbError::InvalidColumn {
            column: "status",
            value: row.status.clone(),
        })?;

        Ok(ScrapingJob {
            id: row.id,
            product_url: row.product_url,
            status,
            last_scraped_at: row.last_scraped_at,
            error: row.error,
            created_at: row.created_at,
        })
    }
}

const JOB_COLUMNS: &str =
    "id, product_url, status, last_scraped_at, error, created_at, updated_at";

// ---------------------------------------------------------------------------
// tracking_jobs operations
// ---------------------------------------------------------------------------

/// Creates a tracking job in `pending` status for `product_url`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_tracking_job(
    pool: &PgPool,
    product_url: &str,
) -> Result<TrackingJobRow, DbError> {
    let sql = format!(
        "INSERT INTO tracking_jobs (id, product_url, status) \
         VALUES ($1, $2, 'pending') \
         RETURNING {JOB_COLUMNS}"
    );

    let row = sqlx::query_as::<_, TrackingJobRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(product_url)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// `pending → processing`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not pending, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_tracking_job(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE tracking_jobs \
         SET status = 'processing', updated_at = NOW() \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "pending",
        });
    }

    Ok(())
}

/// `processing → completed`, recording when the page was scraped.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not processing, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_tracking_job(
    pool: &PgPool,
    id: Uuid,
    scraped_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE tracking_jobs \
         SET status = 'completed', last_scraped_at = $1, error = NULL, updated_at = NOW() \
         WHERE id = $2 AND status = 'processing'",
    )
    .bind(scraped_at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "processing",
        });
    }

    Ok(())
}

/// `pending | processing → failed`, storing the error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job already finished, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_tracking_job(pool: &PgPool, id: Uuid, error: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE tracking_jobs \
         SET status = 'failed', error = $1, updated_at = NOW() \
         WHERE id = $2 AND status IN ('pending', 'processing')",
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "pending or processing",
        });
    }

    Ok(())
}

/// Fetches a single tracking job.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no job has this id, or [`DbError::Sqlx`]
/// on query failure.
pub async fn get_tracking_job(pool: &PgPool, id: Uuid) -> Result<TrackingJobRow, DbError> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM tracking_jobs WHERE id = $1");

    sqlx::query_as::<_, TrackingJobRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Most recent jobs first, capped at `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracking_jobs(pool: &PgPool, limit: i64) -> Result<Vec<TrackingJobRow>, DbError> {
    let sql = format!(
        "SELECT {JOB_COLUMNS} FROM tracking_jobs \
         ORDER BY created_at DESC, id \
         LIMIT $1"
    );

    let rows = sqlx::query_as::<_, TrackingJobRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
