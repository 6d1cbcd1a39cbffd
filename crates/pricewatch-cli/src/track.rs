//! Batch tracking and tracked products file management.
//!
//! A failing URL is reported in the summary and never aborts the run.

use std::sync::Arc;

use pricewatch_core::{
    append_tracked_product, load_tracked_products, AppConfig, ScrapingJob, SourceSite,
    TrackedProductEntry, TrackedProductsFile,
};
use pricewatch_db::PgProductStore;
use pricewatch_scraper::{
    build_dispatcher, plan_targets, track_products, TrackerSettings, TrackingSummary,
};

/// Narrow the tracked list to a single product when `filter` is set.
pub(crate) fn select_entries(
    file: TrackedProductsFile,
    filter: Option<&str>,
) -> anyhow::Result<Vec<TrackedProductEntry>> {
    match filter {
        Some(name) => {
            let entry = file
                .find(name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("tracked product '{name}' not found"))?;
            Ok(vec![entry])
        }
        None => Ok(file.products),
    }
}

pub(crate) async fn run_track(
    config: &AppConfig,
    filter: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let file = load_tracked_products(&config.tracked_products_path)?;
    let entries = select_entries(file, filter)?;

    if dry_run {
        let targets = plan_targets(&entries);
        println!(
            "dry-run: would scrape {} urls for {} products",
            targets.len(),
            entries.len()
        );
        for (name, site, url) in targets {
            println!("  {name} [{site}] {url}");
        }
        return Ok(());
    }

    let pool = crate::connect(config).await?;
    let dispatcher = build_dispatcher(config, Arc::new(PgProductStore::new(pool)));
    let summary = track_products(
        &dispatcher,
        &entries,
        &TrackerSettings::from_app_config(config),
    )
    .await;

    print_summary(&summary);

    if summary.attempted() > 0 && summary.succeeded() == 0 {
        anyhow::bail!("all {} tracked urls failed", summary.attempted());
    }
    Ok(())
}

fn print_summary(summary: &TrackingSummary) {
    for report in &summary.reports {
        match &report.result {
            Ok(product) => println!(
                "ok    {} [{}] {:.2} {}",
                report.product_name, report.site, product.price, product.stock_status
            ),
            Err(e) => println!("FAIL  {} [{}] {e}", report.product_name, report.site),
        }
    }
    println!(
        "tracked {} urls: {} succeeded, {} failed",
        summary.attempted(),
        summary.succeeded(),
        summary.failed()
    );
}

pub(crate) async fn run_jobs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = pricewatch_db::list_tracking_jobs(pool, limit).await?;
    if rows.is_empty() {
        println!("no tracking jobs recorded");
        return Ok(());
    }
    for row in rows {
        println!("{}", format_job_line(&ScrapingJob::try_from(row)?));
    }
    Ok(())
}

pub(crate) fn format_job_line(job: &ScrapingJob) -> String {
    let mut line = format!(
        "{id}  {status:<10}  {created}  {url}",
        id = job.id,
        status = job.status.as_str(),
        created = job.created_at.format("%Y-%m-%d %H:%M"),
        url = job.product_url,
    );
    if let Some(error) = &job.error {
        line.push_str("\n    error: ");
        line.push_str(error);
    }
    line
}

pub(crate) fn run_products_list(config: &AppConfig) -> anyhow::Result<()> {
    let file = load_tracked_products(&config.tracked_products_path)?;
    for entry in &file.products {
        let sites: Vec<&str> = entry
            .scrape_targets()
            .map(|(site, _)| site.as_str())
            .collect();
        println!("{} ({})", entry.name, sites.join(", "));
    }
    Ok(())
}

pub(crate) fn run_products_add(config: &AppConfig, entry: TrackedProductEntry) -> anyhow::Result<()> {
    let name = entry.name.clone();
    let file = append_tracked_product(&config.tracked_products_path, entry)?;
    println!(
        "added '{name}'; {} products now tracked in {}",
        file.products.len(),
        config.tracked_products_path.display()
    );
    Ok(())
}

pub(crate) fn entry_from_args(
    name: String,
    amazon: Option<String>,
    ebay: Option<String>,
    walmart: Option<String>,
    aliexpress: Option<String>,
) -> TrackedProductEntry {
    let urls = [
        (SourceSite::Amazon, amazon),
        (SourceSite::Ebay, ebay),
        (SourceSite::Walmart, walmart),
        (SourceSite::Aliexpress, aliexpress),
    ]
    .into_iter()
    .filter(|(_, url)| url.is_some())
    .collect();

    TrackedProductEntry { name, urls }
}
