use pricewatch_core::{ScrapedProduct, SourceSite, StoreError};
use thiserror::Error;

/// Failures while driving the headless browser.
///
/// The browser driver reports `anyhow` errors, so causes are captured as
/// rendered strings.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch browser: {reason}")]
    Launch { reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("failed to read page content from {url}: {reason}")]
    Content { url: String, reason: String },

    #[error("scrape of {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
}

/// A site scraper could not produce a product for `url`.
#[derive(Debug, Error)]
#[error("failed to scrape {site} product at {url}: {source}")]
pub struct ExtractionError {
    pub url: String,
    pub site: SourceSite,
    #[source]
    pub source: SessionError,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("product rejected: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything that can end a single dispatch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported site: {url}")]
    UnsupportedSite { url: String },

    #[error("No scraper available for {site} ({url})")]
    NoScraperAvailable { site: SourceSite, url: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Extraction succeeded but the write was rejected. The product is kept
    /// so callers can still return it.
    #[error("scraped {url} but could not persist it: {source}")]
    Persistence {
        url: String,
        product: Box<ScrapedProduct>,
        #[source]
        source: PersistError,
    },
}

impl PipelineError {
    /// The extracted product, when the failure happened after extraction.
    #[must_use]
    pub fn product(&self) -> Option<&ScrapedProduct> {
        match self {
            PipelineError::Persistence { product, .. } => Some(product.as_ref()),
            _ => None,
        }
    }

    /// `true` for routing failures that no amount of retrying will fix.
    #[must_use]
    pub fn is_unroutable(&self) -> bool {
        matches!(
            self,
            PipelineError::UnsupportedSite { .. } | PipelineError::NoScraperAvailable { .. }
        )
    }
}
