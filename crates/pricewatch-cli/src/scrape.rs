//! One-off scraping and price comparison.

use std::sync::Arc;

use pricewatch_core::{AppConfig, MemoryProductStore, ProductStore, ScrapedProduct};
use pricewatch_db::PgProductStore;
use pricewatch_scraper::{build_dispatcher, find_best_offers, PipelineError};

/// Scrape `url` and print the product as JSON.
///
/// With `dry_run` nothing is written and no database connection is opened.
/// A product that was extracted but could not be stored is still printed.
pub(crate) async fn run_scrape(config: &AppConfig, url: &str, dry_run: bool) -> anyhow::Result<()> {
    let store: Arc<dyn ProductStore> = if dry_run {
        Arc::new(MemoryProductStore::new())
    } else {
        Arc::new(PgProductStore::new(crate::connect(config).await?))
    };
    let dispatcher = build_dispatcher(config, store);

    let outcome = if dry_run {
        dispatcher.scrape(url).await
    } else {
        dispatcher.dispatch(url).await
    };

    let product = match outcome {
        Ok(product) => product,
        Err(PipelineError::Persistence {
            product, source, ..
        }) => {
            tracing::warn!(url, error = %source, "product scraped but not stored");
            *product
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&product)?);
    Ok(())
}

pub(crate) async fn run_compare(pool: &sqlx::PgPool, title: &str) -> anyhow::Result<()> {
    let store = PgProductStore::new(pool.clone());
    let offers = find_best_offers(&store, title).await?;

    if offers.is_empty() {
        println!("no offers found for '{title}'");
        return Ok(());
    }

    for (index, offer) in offers.iter().enumerate() {
        println!("{}", format_offer_line(index + 1, offer));
    }
    Ok(())
}

pub(crate) async fn run_show(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<()> {
    let product = pricewatch_db::get_scraped_product(pool, id)
        .await?
        .into_product()?;
    println!("{}", serde_json::to_string_pretty(&product)?);
    Ok(())
}

pub(crate) fn format_offer_line(rank: usize, offer: &ScrapedProduct) -> String {
    format!(
        "{rank:>2}. {price:>10.2}  {site:<10}  {stock:<12}  {title}\n    {url}",
        price = offer.price,
        site = offer.source_site.as_str(),
        stock = offer.stock_status.as_str(),
        title = offer.title,
        url = offer.source_url,
    )
}
