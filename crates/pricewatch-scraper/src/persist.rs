//! Normalization and write-through to the product store.

use std::sync::Arc;

use chrono::Utc;
use pricewatch_core::{ProductStore, ScrapedProduct};

use crate::error::{PersistError, PipelineError};

/// Largest price the `NUMERIC(12, 2)` column holds.
pub const MAX_PRICE: f64 = 9_999_999_999.99;

/// Tidy a freshly extracted record before it is stored.
///
/// Text fields are trimmed. A price that is non-finite, negative or above
/// [`MAX_PRICE`] came from a garbled listing and becomes `0`.
#[must_use]
pub fn normalize_product(mut product: ScrapedProduct) -> ScrapedProduct {
    product.title = product.title.trim().to_string();
    product.description = product.description.trim().to_string();
    product.image_url = product.image_url.trim().to_string();
    product.source_url = product.source_url.trim().to_string();
    if !product.price.is_finite() || product.price < 0.0 || product.price > MAX_PRICE {
        product.price = 0.0;
    }
    product
}

fn validate(product: &ScrapedProduct) -> Result<(), PersistError> {
    if product.title.is_empty() {
        return Err(PersistError::Invalid("title is empty".to_string()));
    }
    if product.source_url.is_empty() {
        return Err(PersistError::Invalid("source URL is empty".to_string()));
    }
    Ok(())
}

/// Writes scraped products with last-write-wins semantics keyed by
/// [`ScrapedProduct::natural_key`].
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn ProductStore>,
}

impl Persister {
    #[must_use]
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.store
    }

    /// Normalize, stamp `updated_at`, and upsert. On success the returned
    /// product carries the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] when the record is rejected or
    /// the store fails. The error still carries the normalized product.
    pub async fn persist(&self, product: ScrapedProduct) -> Result<ScrapedProduct, PipelineError> {
        let mut product = normalize_product(product);

        let outcome = match validate(&product) {
            Ok(()) => self
                .store
                .upsert_product(&product, Utc::now())
                .await
                .map_err(PersistError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(id) => {
                product.id = Some(id);
                Ok(product)
            }
            Err(source) => {
                tracing::error!(
                    url = %product.source_url,
                    site = %product.source_site,
                    error = %source,
                    "failed to persist scraped product"
                );
                Err(PipelineError::Persistence {
                    url: product.source_url.clone(),
                    product: Box::new(product),
                    source,
                })
            }
        }
    }
}
