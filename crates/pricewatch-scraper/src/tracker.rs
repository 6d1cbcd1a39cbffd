//! Batch tracking over the configured product list.
//!
//! URLs are processed strictly one after another with a fixed pause between
//! them. A failing URL is logged and recorded; it never stops the run.

use std::time::Duration;

use pricewatch_core::{ScrapedProduct, SourceSite, TrackedProductEntry};

use crate::error::PipelineError;
use crate::retry::retry_with_backoff;
use crate::router::Dispatcher;

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    /// Pause between successive URLs, applied regardless of outcome.
    pub batch_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            batch_delay: Duration::from_millis(2000),
            max_retries: 0,
            retry_backoff_base_secs: 5,
        }
    }
}

/// Result of one tracked URL.
#[derive(Debug)]
pub struct UrlReport {
    pub product_name: String,
    pub site: SourceSite,
    pub url: String,
    pub result: Result<ScrapedProduct, PipelineError>,
}

#[derive(Debug, Default)]
pub struct TrackingSummary {
    pub reports: Vec<UrlReport>,
}

impl TrackingSummary {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.reports.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }
}

/// Planned `(product, site, url)` triples in processing order. Sites with
/// no URL are skipped.
#[must_use]
pub fn plan_targets(entries: &[TrackedProductEntry]) -> Vec<(&str, SourceSite, &str)> {
    entries
        .iter()
        .flat_map(|entry| {
            entry
                .scrape_targets()
                .map(move |(site, url)| (entry.name.as_str(), site, url))
        })
        .collect()
}

/// Scrape and persist every configured URL of every entry, in list order.
pub async fn track_products(
    dispatcher: &Dispatcher,
    entries: &[TrackedProductEntry],
    settings: &TrackerSettings,
) -> TrackingSummary {
    let targets = plan_targets(entries);
    tracing::info!(
        products = entries.len(),
        urls = targets.len(),
        "starting tracking run"
    );

    let mut summary = TrackingSummary::default();

    for (index, (product_name, site, url)) in targets.into_iter().enumerate() {
        if index > 0 && !settings.batch_delay.is_zero() {
            tokio::time::sleep(settings.batch_delay).await;
        }

        tracing::info!(product = product_name, %site, url, "tracking url");
        if SourceSite::from_url(url) != Some(site) {
            tracing::warn!(
                product = product_name,
                %site,
                url,
                "url does not belong to the site it is listed under"
            );
        }

        let result = retry_with_backoff(
            settings.max_retries,
            settings.retry_backoff_base_secs,
            || dispatcher.dispatch(url),
        )
        .await;

        match &result {
            Ok(product) => tracing::info!(
                product = product_name,
                %site,
                title = %product.title,
                price = product.price,
                availability = product.availability,
                "tracked url scraped"
            ),
            Err(e) => tracing::error!(
                product = product_name,
                %site,
                url,
                error = %e,
                "tracking failed for url"
            ),
        }

        summary.reports.push(UrlReport {
            product_name: product_name.to_string(),
            site,
            url: url.to_string(),
            result,
        });
    }

    tracing::info!(
        attempted = summary.attempted(),
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "tracking run complete"
    );

    summary
}
