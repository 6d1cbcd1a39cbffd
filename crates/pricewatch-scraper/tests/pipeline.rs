//! End-to-end pipeline tests against a scripted browser.
//!
//! The fake provider serves canned HTML per URL, so the real selector sets,
//! session manager, router, persister and tracker run without Chrome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pricewatch_core::{
    load_tracked_products, MemoryProductStore, ProductStore, SourceSite, TrackedProductEntry,
};
use pricewatch_scraper::{
    default_registry, find_best_offers, plan_targets, track_products, BrowserSession, DelayRange, Dispatcher,
    MarketplaceScraper, PipelineError, ScraperRegistry, SessionError, SessionManager,
    SessionProvider, SessionSettings, SiteScraper, TrackerSettings,
};

const IPHONE_AMAZON: &str = "https://www.amazon.com/Apple-iPhone-13-128GB-Blue/dp/B09G9HD6PD";
const IPHONE_WALMART: &str = "https://www.walmart.com/ip/Apple-iPhone-13-128GB-Blue/974936004";
const GALAXY_AMAZON: &str = "https://www.amazon.com/Samsung-Galaxy-S21-5G-256GB/dp/B08N3BYNDN";
const GALAXY_EBAY: &str = "https://www.ebay.com/sch/i.html?_nkw=Samsung+Galaxy+S21";

fn amazon_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><body>
        <span id="productTitle">{title}</span>
        <span class="a-price-whole">{price}</span>
        <div id="availability"><span>In Stock.</span></div>
        <img id="landingImage" src="https://m.media-amazon.com/images/I/x.jpg">
        <div id="productDescription">Fast and capable.</div>
        <table id="productDetails_techSpec_section_1">
          <tr><th>Brand</th><td>Apple</td></tr>
        </table>
        </body></html>"#
    )
}

fn walmart_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><body>
        <h1 id="main-title">{title}</h1>
        <span itemprop="price">${price}</span>
        <div data-testid="add-to-cart-section">In stock</div>
        </body></html>"#
    )
}

#[derive(Clone)]
enum Page {
    Html(String),
    NavigationError,
    Hang,
}

#[derive(Clone, Default)]
struct Counters {
    acquired: Arc<AtomicUsize>,
    release_calls: Arc<AtomicUsize>,
    navigations: Arc<AtomicUsize>,
}

impl Counters {
    fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
struct FakeProvider {
    pages: Arc<HashMap<String, Page>>,
    counters: Counters,
    fail_launch: bool,
}

impl FakeProvider {
    fn with_pages(pages: impl IntoIterator<Item = (&'static str, Page)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, page)| (url.to_string(), page))
                    .collect(),
            ),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        if self.fail_launch {
            return Err(SessionError::Launch {
                reason: "no chrome binary".to_string(),
            });
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: Arc::clone(&self.pages),
            counters: self.counters.clone(),
            current: None,
        }))
    }
}

struct FakeSession {
    pages: Arc<HashMap<String, Page>>,
    counters: Counters,
    current: Option<(String, String)>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(Page::Html(html)) => {
                self.current = Some((url.to_string(), html.clone()));
                Ok(())
            }
            Some(Page::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Some(Page::NavigationError) | None => Err(SessionError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        self.current
            .as_ref()
            .map(|(_, html)| html.clone())
            .ok_or_else(|| SessionError::Content {
                url: String::new(),
                reason: "nothing loaded".to_string(),
            })
    }

    async fn release(&mut self) {
        self.counters.release_calls.fetch_add(1, Ordering::SeqCst);
        self.current = None;
    }
}

fn sessions(provider: &FakeProvider, timeout: Duration) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        Arc::new(provider.clone()),
        SessionSettings {
            page_delay: DelayRange::none(),
            scrape_timeout: timeout,
        },
    ))
}

fn dispatcher(provider: &FakeProvider, store: Arc<MemoryProductStore>) -> Dispatcher {
    let sessions = sessions(provider, Duration::from_secs(5));
    Dispatcher::new(default_registry(&sessions), store)
}

fn tracked(name: &str, urls: &[(SourceSite, Option<&str>)]) -> TrackedProductEntry {
    TrackedProductEntry {
        name: name.to_string(),
        urls: urls
            .iter()
            .map(|(site, url)| (*site, url.map(str::to_string)))
            .collect(),
    }
}

fn no_delay() -> TrackerSettings {
    TrackerSettings {
        batch_delay: Duration::ZERO,
        max_retries: 0,
        retry_backoff_base_secs: 0,
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatch_scrapes_persists_and_assigns_id() {
    let provider = FakeProvider::with_pages([(
        IPHONE_AMAZON,
        Page::Html(amazon_page("Apple iPhone 13, 128GB, Blue", "699.")),
    )]);
    let store = Arc::new(MemoryProductStore::new());
    let dispatcher = dispatcher(&provider, Arc::clone(&store));

    let product = dispatcher.dispatch(IPHONE_AMAZON).await.expect("dispatch");

    assert!(product.id.is_some());
    assert_eq!(product.source_site, SourceSite::Amazon);
    assert_eq!(product.source_url, IPHONE_AMAZON);
    assert!((product.price - 699.0).abs() < f64::EPSILON);
    assert!(product.availability);
    assert_eq!(
        product.specifications.get("Brand").map(String::as_str),
        Some("Apple")
    );
    assert_eq!(store.len(), 1);
    assert_eq!(provider.counters.release_calls(), 1);
}

#[tokio::test]
async fn rescraping_unchanged_page_differs_only_in_timestamp() {
    let provider = FakeProvider::with_pages([(
        IPHONE_AMAZON,
        Page::Html(amazon_page("Apple iPhone 13", "699")),
    )]);
    let store = Arc::new(MemoryProductStore::new());
    let dispatcher = dispatcher(&provider, Arc::clone(&store));

    let first = dispatcher.dispatch(IPHONE_AMAZON).await.unwrap();
    let mut second = dispatcher.dispatch(IPHONE_AMAZON).await.unwrap();

    assert!(second.timestamp >= first.timestamp);
    second.timestamp = first.timestamp;
    assert_eq!(first, second);
    assert_eq!(store.len(), 1, "upsert keyed by source URL");
}

#[tokio::test]
async fn unsupported_url_is_rejected_before_any_browser_work() {
    let provider = FakeProvider::default();
    let dispatcher = dispatcher(&provider, Arc::new(MemoryProductStore::new()));

    let err = dispatcher
        .dispatch("https://www.target.com/p/iphone-13/-/A-84616123")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedSite { .. }));
    assert_eq!(provider.counters.acquired(), 0);
}

#[tokio::test]
async fn unregistered_site_reports_no_scraper() {
    let provider = FakeProvider::default();
    let sessions = sessions(&provider, Duration::from_secs(5));
    let registry = ScraperRegistry::new().with(Arc::new(MarketplaceScraper::new(
        SourceSite::Amazon,
        sessions,
    )));
    assert_eq!(
        registry.missing_sites(),
        vec![SourceSite::Ebay, SourceSite::Walmart, SourceSite::Aliexpress]
    );
    let dispatcher = Dispatcher::new(registry, Arc::new(MemoryProductStore::new()));

    let err = dispatcher.dispatch(GALAXY_EBAY).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::NoScraperAvailable {
            site: SourceSite::Ebay,
            ..
        }
    ));
    assert_eq!(err.to_string(), format!("No scraper available for ebay ({GALAXY_EBAY})"));
}

#[tokio::test]
async fn page_without_title_is_scraped_but_not_stored() {
    let provider = FakeProvider::with_pages([(
        IPHONE_AMAZON,
        Page::Html("<html><body><p>Robot check</p></body></html>".to_string()),
    )]);
    let store = Arc::new(MemoryProductStore::new());
    let dispatcher = dispatcher(&provider, Arc::clone(&store));

    let err = dispatcher.dispatch(IPHONE_AMAZON).await.unwrap_err();

    let product = err.product().expect("product survives persistence failure");
    assert_eq!(product.title, "");
    assert!(product.price.abs() < f64::EPSILON);
    assert!(!product.availability);
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// Session release guarantees
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_released_once_on_navigation_failure() {
    let provider = FakeProvider::with_pages([(IPHONE_AMAZON, Page::NavigationError)]);
    let scraper = MarketplaceScraper::new(
        SourceSite::Amazon,
        sessions(&provider, Duration::from_secs(5)),
    );

    let err = scraper.scrape_product(IPHONE_AMAZON).await.unwrap_err();

    assert_eq!(err.url, IPHONE_AMAZON);
    assert_eq!(err.site, SourceSite::Amazon);
    assert!(matches!(err.source, SessionError::Navigation { .. }));
    assert_eq!(provider.counters.acquired(), 1);
    assert_eq!(provider.counters.release_calls(), 1);
}

#[tokio::test]
async fn session_released_once_on_timeout() {
    let provider = FakeProvider::with_pages([(IPHONE_AMAZON, Page::Hang)]);
    let scraper = MarketplaceScraper::new(
        SourceSite::Amazon,
        sessions(&provider, Duration::from_millis(50)),
    );

    let err = scraper.scrape_product(IPHONE_AMAZON).await.unwrap_err();

    assert!(matches!(err.source, SessionError::Timeout { .. }));
    assert_eq!(provider.counters.release_calls(), 1);
}

#[tokio::test]
async fn launch_failure_propagates_without_release() {
    let provider = FakeProvider {
        fail_launch: true,
        ..FakeProvider::default()
    };
    let scraper = MarketplaceScraper::new(
        SourceSite::Amazon,
        sessions(&provider, Duration::from_secs(5)),
    );

    let err = scraper.scrape_product(IPHONE_AMAZON).await.unwrap_err();

    assert!(matches!(err.source, SessionError::Launch { .. }));
    assert_eq!(provider.counters.release_calls(), 0);
}

// ---------------------------------------------------------------------------
// Batch tracking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn site_without_url_is_never_scraped() {
    let provider = FakeProvider::with_pages([(
        GALAXY_AMAZON,
        Page::Html(amazon_page("Samsung Galaxy S21 5G", "549.")),
    )]);
    let dispatcher = dispatcher(&provider, Arc::new(MemoryProductStore::new()));
    let entries = [tracked(
        "Samsung Galaxy S21",
        &[(SourceSite::Amazon, Some(GALAXY_AMAZON)), (SourceSite::Ebay, None)],
    )];

    let summary = track_products(&dispatcher, &entries, &no_delay()).await;

    assert_eq!(summary.attempted(), 1);
    assert_eq!(provider.counters.acquired(), 1);
    assert_eq!(summary.reports[0].site, SourceSite::Amazon);
}

#[tokio::test]
async fn one_failing_url_does_not_stop_the_batch() {
    let provider = FakeProvider::with_pages([
        (IPHONE_AMAZON, Page::Html(amazon_page("iPhone 13 128GB", "699."))),
        (IPHONE_WALMART, Page::NavigationError),
        (GALAXY_AMAZON, Page::Html(amazon_page("Samsung Galaxy S21", "549."))),
    ]);
    let store = Arc::new(MemoryProductStore::new());
    let dispatcher = dispatcher(&provider, Arc::clone(&store));
    let entries = [
        tracked(
            "iPhone 13 128GB",
            &[
                (SourceSite::Amazon, Some(IPHONE_AMAZON)),
                (SourceSite::Walmart, Some(IPHONE_WALMART)),
            ],
        ),
        tracked(
            "Samsung Galaxy S21",
            &[(SourceSite::Amazon, Some(GALAXY_AMAZON))],
        ),
    ];

    let summary = track_products(&dispatcher, &entries, &no_delay()).await;

    assert_eq!(summary.attempted(), 3);
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 1);
    let failed = summary
        .reports
        .iter()
        .find(|r| r.result.is_err())
        .expect("one failure");
    assert_eq!(failed.url, IPHONE_WALMART);
    assert_eq!(
        summary.reports.last().map(|r| r.product_name.as_str()),
        Some("Samsung Galaxy S21")
    );
    assert_eq!(store.len(), 2);
    assert_eq!(
        provider.counters.release_calls(),
        provider.counters.acquired()
    );
}

fn write_tracked_file(label: &str, yaml: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!(
        "pricewatch-pipeline-{label}-{}.yaml",
        std::process::id()
    ));
    std::fs::write(&path, yaml).expect("write tracked products file");
    path
}

#[tokio::test]
async fn url_under_wrong_site_fails_alone() {
    let path = write_tracked_file(
        "wrong-site",
        &format!(
            "products:\n  - name: Good\n    urls:\n      amazon: {IPHONE_AMAZON}\n  \
             - name: Bad\n    urls:\n      walmart: https://www.target.com/p/2\n"
        ),
    );
    let file = load_tracked_products(&path).expect("structurally valid file loads");
    std::fs::remove_file(&path).ok();

    let provider = FakeProvider::with_pages([(
        IPHONE_AMAZON,
        Page::Html(amazon_page("iPhone 13 128GB", "699.")),
    )]);
    let store = Arc::new(MemoryProductStore::new());
    let dispatcher = dispatcher(&provider, Arc::clone(&store));

    let summary = track_products(&dispatcher, &file.products, &no_delay()).await;

    assert_eq!(summary.attempted(), 2);
    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.reports[0].product_name, "Good");
    assert!(matches!(
        summary.reports[1].result,
        Err(PipelineError::UnsupportedSite { .. })
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn sites_are_planned_in_listed_order() {
    let path = write_tracked_file(
        "order",
        &format!(
            "products:\n  - name: iPhone 13\n    urls:\n      walmart: {IPHONE_WALMART}\n      \
             amazon: {IPHONE_AMAZON}\n"
        ),
    );
    let file = load_tracked_products(&path).expect("file loads");
    std::fs::remove_file(&path).ok();

    let sites: Vec<_> = plan_targets(&file.products)
        .into_iter()
        .map(|(_, site, _)| site)
        .collect();
    assert_eq!(sites, vec![SourceSite::Walmart, SourceSite::Amazon]);
}

#[tokio::test]
async fn batch_waits_between_successive_urls() {
    let provider = FakeProvider::with_pages([
        (IPHONE_AMAZON, Page::Html(amazon_page("iPhone 13", "699"))),
        (GALAXY_AMAZON, Page::Html(amazon_page("Galaxy S21", "549"))),
        (IPHONE_WALMART, Page::NavigationError),
    ]);
    let dispatcher = dispatcher(&provider, Arc::new(MemoryProductStore::new()));
    let entries = [
        tracked(
            "iPhone 13",
            &[
                (SourceSite::Amazon, Some(IPHONE_AMAZON)),
                (SourceSite::Walmart, Some(IPHONE_WALMART)),
            ],
        ),
        tracked("Galaxy S21", &[(SourceSite::Amazon, Some(GALAXY_AMAZON))]),
    ];
    let settings = TrackerSettings {
        batch_delay: Duration::from_millis(40),
        ..no_delay()
    };

    let started = Instant::now();
    let summary = track_products(&dispatcher, &entries, &settings).await;

    assert_eq!(summary.attempted(), 3);
    assert!(
        started.elapsed() >= Duration::from_millis(80),
        "two pauses expected between three URLs, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn tracked_offers_compare_cheapest_first() {
    let provider = FakeProvider::with_pages([
        (IPHONE_AMAZON, Page::Html(amazon_page("iPhone 13 128GB", "699."))),
        (IPHONE_WALMART, Page::Html(walmart_page("iPhone 13 Pro", "999.00"))),
    ]);
    let store = Arc::new(MemoryProductStore::new());
    let dispatcher = dispatcher(&provider, Arc::clone(&store));
    let entries = [tracked(
        "iPhone 13",
        &[
            (SourceSite::Walmart, Some(IPHONE_WALMART)),
            (SourceSite::Amazon, Some(IPHONE_AMAZON)),
        ],
    )];

    let summary = track_products(&dispatcher, &entries, &no_delay()).await;
    assert_eq!(summary.succeeded(), 2);

    let offers = find_best_offers(store.as_ref() as &dyn ProductStore, "iPhone 13")
        .await
        .unwrap();
    let prices: Vec<f64> = offers.iter().map(|o| o.price).collect();
    assert_eq!(prices, vec![699.0, 999.0]);
    assert_eq!(offers[0].source_site, SourceSite::Amazon);
    assert_eq!(offers[1].source_site, SourceSite::Walmart);
}
