//! Per-marketplace selector sets and the shared scraper that applies them.

pub mod aliexpress;
pub mod amazon;
pub mod ebay;
pub mod walmart;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pricewatch_core::{ScrapedProduct, SourceSite};

use crate::contract::SiteScraper;
use crate::error::ExtractionError;
use crate::extract::{extract_fields, SiteSelectors};
use crate::router::ScraperRegistry;
use crate::session::SessionManager;

#[must_use]
pub fn selectors_for(site: SourceSite) -> &'static SiteSelectors {
    match site {
        SourceSite::Amazon => &amazon::SELECTORS,
        SourceSite::Ebay => &ebay::SELECTORS,
        SourceSite::Walmart => &walmart::SELECTORS,
        SourceSite::Aliexpress => &aliexpress::SELECTORS,
    }
}

/// Selector-driven scraper. Stateless apart from the shared session manager.
pub struct MarketplaceScraper {
    site: SourceSite,
    selectors: &'static SiteSelectors,
    sessions: Arc<SessionManager>,
}

impl MarketplaceScraper {
    #[must_use]
    pub fn new(site: SourceSite, sessions: Arc<SessionManager>) -> Self {
        Self {
            site,
            selectors: selectors_for(site),
            sessions,
        }
    }
}

#[async_trait]
impl SiteScraper for MarketplaceScraper {
    fn site(&self) -> SourceSite {
        self.site
    }

    async fn scrape_product(&self, url: &str) -> Result<ScrapedProduct, ExtractionError> {
        let selectors = self.selectors;
        let fields = self
            .sessions
            .scrape_page(url, |document| extract_fields(document, selectors))
            .await
            .map_err(|source| ExtractionError {
                url: url.to_string(),
                site: self.site,
                source,
            })?;

        Ok(fields.into_product(url, self.site, Utc::now()))
    }
}

/// Registry with a [`MarketplaceScraper`] for every supported marketplace.
#[must_use]
pub fn default_registry(sessions: &Arc<SessionManager>) -> ScraperRegistry {
    SourceSite::ALL
        .into_iter()
        .fold(ScraperRegistry::new(), |registry, site| {
            registry.with(Arc::new(MarketplaceScraper::new(site, Arc::clone(sessions))))
        })
}
