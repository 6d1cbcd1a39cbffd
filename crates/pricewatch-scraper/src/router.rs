//! URL → marketplace resolution and dispatch to the registered scraper.

use std::collections::HashMap;
use std::sync::Arc;

use pricewatch_core::{ProductStore, ScrapedProduct, SourceSite};

use crate::contract::SiteScraper;
use crate::error::PipelineError;
use crate::persist::Persister;

/// Resolve the marketplace for `url`.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedSite`] when no known marketplace name
/// occurs in the URL.
pub fn resolve_site(url: &str) -> Result<SourceSite, PipelineError> {
    SourceSite::from_url(url).ok_or_else(|| PipelineError::UnsupportedSite {
        url: url.to_string(),
    })
}

/// Scrapers keyed by marketplace. Built explicitly and handed to a
/// [`Dispatcher`]; a site may be declared without a scraper.
#[derive(Default, Clone)]
pub struct ScraperRegistry {
    scrapers: HashMap<SourceSite, Arc<dyn SiteScraper>>,
}

impl ScraperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `scraper` under its own site, returning any scraper it replaced.
    pub fn register(&mut self, scraper: Arc<dyn SiteScraper>) -> Option<Arc<dyn SiteScraper>> {
        self.scrapers.insert(scraper.site(), scraper)
    }

    #[must_use]
    pub fn with(mut self, scraper: Arc<dyn SiteScraper>) -> Self {
        self.register(scraper);
        self
    }

    #[must_use]
    pub fn get(&self, site: SourceSite) -> Option<&Arc<dyn SiteScraper>> {
        self.scrapers.get(&site)
    }

    /// Declared marketplaces with no registered scraper.
    #[must_use]
    pub fn missing_sites(&self) -> Vec<SourceSite> {
        SourceSite::ALL
            .into_iter()
            .filter(|site| !self.scrapers.contains_key(site))
            .collect()
    }

    /// Warn once per declared marketplace that cannot be dispatched.
    pub fn log_coverage(&self) {
        for site in self.missing_sites() {
            tracing::warn!(%site, "no scraper registered; URLs for this site will be rejected");
        }
    }
}

pub struct Dispatcher {
    registry: ScraperRegistry,
    persister: Persister,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: ScraperRegistry, store: Arc<dyn ProductStore>) -> Self {
        Self {
            registry,
            persister: Persister::new(store),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ScraperRegistry {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ProductStore> {
        self.persister.store()
    }

    /// Resolve and extract without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedSite`],
    /// [`PipelineError::NoScraperAvailable`], or
    /// [`PipelineError::Extraction`].
    pub async fn scrape(&self, url: &str) -> Result<ScrapedProduct, PipelineError> {
        let site = resolve_site(url)?;
        let scraper = self
            .registry
            .get(site)
            .ok_or_else(|| PipelineError::NoScraperAvailable {
                site,
                url: url.to_string(),
            })?;

        let product = scraper.scrape_product(url).await?;
        tracing::info!(
            url,
            %site,
            title = %product.title,
            price = product.price,
            availability = product.availability,
            "product scraped"
        );
        Ok(product)
    }

    /// Resolve, extract, and upsert. The returned product carries its
    /// store id.
    ///
    /// # Errors
    ///
    /// Everything [`Dispatcher::scrape`] returns, plus
    /// [`PipelineError::Persistence`] which still holds the scraped product.
    pub async fn dispatch(&self, url: &str) -> Result<ScrapedProduct, PipelineError> {
        let product = self.scrape(url).await?;
        self.persister.persist(product).await
    }
}
