//! Storage seams for scraped products and tracking jobs.
//!
//! The scraper crate only talks to these traits. `pricewatch-db` provides
//! the Postgres implementations; the in-memory versions here back the CLI's
//! offline mode and most tests.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::jobs::{JobStatus, ScrapingJob};
use crate::products::ScrapedProduct;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("job {id} cannot transition: expected status {expected}")]
    InvalidTransition { id: Uuid, expected: &'static str },

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert or fully replace the record sharing `product.natural_key()`.
    /// Returns the stable id of the stored row.
    async fn upsert_product(
        &self,
        product: &ScrapedProduct,
        updated_at: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// All records whose title contains `query`, ignoring case. Ordering is
    /// not guaranteed.
    async fn find_by_title(&self, query: &str) -> Result<Vec<ScrapedProduct>, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, product_url: &str) -> Result<ScrapingJob, StoreError>;

    /// `pending → processing`.
    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError>;

    /// `processing → completed`, recording when the page was scraped.
    async fn mark_completed(&self, id: Uuid, scraped_at: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// `pending | processing → failed`.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<ScrapingJob, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredProduct {
    key: String,
    product: ScrapedProduct,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ProductTable {
    next_id: i64,
    rows: Vec<StoredProduct>,
}

#[derive(Debug, Default)]
pub struct MemoryProductStore {
    inner: RwLock<ProductTable>,
}

impl MemoryProductStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<ScrapedProduct> {
        let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        table.rows.iter().map(|r| r.product.clone()).collect()
    }

    /// The `updated_at` stamp of the record stored under `key`, if any.
    #[must_use]
    pub fn updated_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        table
            .rows
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.updated_at)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn upsert_product(
        &self,
        product: &ScrapedProduct,
        updated_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let key = product.natural_key();
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = table.rows.iter_mut().find(|r| r.key == key) {
            let id = existing.product.id.unwrap_or_default();
            existing.product = ScrapedProduct {
                id: Some(id),
                ..product.clone()
            };
            existing.updated_at = updated_at;
            return Ok(id);
        }

        table.next_id += 1;
        let id = table.next_id;
        table.rows.push(StoredProduct {
            key,
            product: ScrapedProduct {
                id: Some(id),
                ..product.clone()
            },
            updated_at,
        });
        Ok(id)
    }

    async fn find_by_title(&self, query: &str) -> Result<Vec<ScrapedProduct>, StoreError> {
        let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table
            .rows
            .iter()
            .filter(|r| r.product.title_contains(query))
            .map(|r| r.product.clone())
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<Vec<ScrapingJob>>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn transition<F>(
        &self,
        id: Uuid,
        allowed: &[JobStatus],
        expected: &'static str,
        apply: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ScrapingJob),
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(StoreError::NotFound)?;
        if !allowed.contains(&job.status) {
            return Err(StoreError::InvalidTransition { id, expected });
        }
        apply(job);
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, product_url: &str) -> Result<ScrapingJob, StoreError> {
        let job = ScrapingJob {
            id: Uuid::new_v4(),
            product_url: product_url.to_string(),
            status: JobStatus::Pending,
            last_scraped_at: None,
            error: None,
            created_at: Utc::now(),
        };
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job.clone());
        Ok(job)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError> {
        self.transition(id, &[JobStatus::Pending], "pending", |job| {
            job.status = JobStatus::Processing;
        })
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        scraped_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.transition(id, &[JobStatus::Processing], "processing", |job| {
            job.status = JobStatus::Completed;
            job.last_scraped_at = Some(scraped_at);
            job.error = None;
        })
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        self.transition(
            id,
            &[JobStatus::Pending, JobStatus::Processing],
            "pending or processing",
            |job| {
                job.status = JobStatus::Failed;
                job.error = Some(error.to_string());
            },
        )
    }

    async fn get_job(&self, id: Uuid) -> Result<ScrapingJob, StoreError> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
