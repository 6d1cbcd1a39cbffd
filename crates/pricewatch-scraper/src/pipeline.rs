//! Wiring from [`AppConfig`] to a ready-to-use [`Dispatcher`].

use std::sync::Arc;
use std::time::Duration;

use pricewatch_core::{AppConfig, ProductStore};

use crate::chrome::{ChromeOptions, ChromeSessionProvider};
use crate::router::Dispatcher;
use crate::session::{DelayRange, SessionManager, SessionSettings};
use crate::sites::default_registry;
use crate::tracker::TrackerSettings;

impl SessionSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_delay: DelayRange::from_millis(config.page_delay_min_ms, config.page_delay_max_ms),
            scrape_timeout: Duration::from_secs(config.scrape_timeout_secs),
        }
    }
}

impl TrackerSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            max_retries: config.scraper_max_retries,
            retry_backoff_base_secs: config.scraper_retry_backoff_base_secs,
        }
    }
}

/// Build a dispatcher backed by headless Chrome with every marketplace
/// registered.
#[must_use]
pub fn build_dispatcher(config: &AppConfig, store: Arc<dyn ProductStore>) -> Dispatcher {
    let provider = ChromeSessionProvider::new(ChromeOptions {
        chrome_path: config.chrome_path.clone(),
        tab_timeout: Some(Duration::from_secs(config.scrape_timeout_secs)),
    });
    let sessions = Arc::new(SessionManager::new(
        Arc::new(provider),
        SessionSettings::from_app_config(config),
    ));

    let registry = default_registry(&sessions);
    registry.log_coverage();
    Dispatcher::new(registry, store)
}
