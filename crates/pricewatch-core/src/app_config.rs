use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub tracked_products_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Chrome/Chromium binary. `None` lets the browser driver auto-detect.
    pub chrome_path: Option<PathBuf>,
    /// Upper bound on navigation plus extraction for a single page.
    pub scrape_timeout_secs: u64,
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,
    /// Fixed pause between successive URLs in a batch run.
    pub batch_delay_ms: u64,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    /// Six-field cron expression for the scheduled batch run.
    pub tracking_schedule: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("tracked_products_path", &self.tracked_products_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("chrome_path", &self.chrome_path)
            .field("scrape_timeout_secs", &self.scrape_timeout_secs)
            .field("page_delay_min_ms", &self.page_delay_min_ms)
            .field("page_delay_max_ms", &self.page_delay_max_ms)
            .field("batch_delay_ms", &self.batch_delay_ms)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("tracking_schedule", &self.tracking_schedule)
            .finish()
    }
}
