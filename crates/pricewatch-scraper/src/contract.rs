use async_trait::async_trait;
use pricewatch_core::{ScrapedProduct, SourceSite};

use crate::error::ExtractionError;

/// A marketplace-specific product scraper.
///
/// Implementations acquire their own browser session per call and must
/// release it before returning, whether or not extraction succeeded.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// The marketplace this scraper handles.
    fn site(&self) -> SourceSite;

    /// Load `url` and extract a normalized product record.
    ///
    /// Individual missing fields fall back to their defaults; only session
    /// level failures (launch, navigation, timeout) are errors.
    async fn scrape_product(&self, url: &str) -> Result<ScrapedProduct, ExtractionError>;
}
