//! Browser session lifecycle for single-page scrapes.
//!
//! A [`SessionProvider`] hands out one [`BrowserSession`] (one browser, one
//! page) per scrape. [`SessionManager::scrape_page`] owns the
//! acquire → navigate → settle → read → release sequence and guarantees the
//! release step runs exactly once whatever happens in between.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use scraper::Html;

use crate::error::SessionError;

/// A live page inside a launched browser.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the load to settle.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Serialized DOM of the current page.
    async fn content(&mut self) -> Result<String, SessionError>;

    /// Close the page, then the browser. Calling it again is a no-op.
    async fn release(&mut self);
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}

/// Inclusive bounds for the randomized pause between navigation and reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Bounds are reordered if given backwards.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Uniform sample in `[min, max]` at millisecond resolution.
    #[must_use]
    pub fn sample(&self) -> Duration {
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        if min_ms == max_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::from_millis(1000, 3000)
    }
}

/// Suspend for a uniformly random duration within `range`.
pub async fn random_delay(range: DelayRange) {
    let pause = range.sample();
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub page_delay: DelayRange,
    /// Bounds navigation, settling and extraction together.
    pub scrape_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_delay: DelayRange::default(),
            scrape_timeout: Duration::from_secs(60),
        }
    }
}

pub struct SessionManager {
    provider: Arc<dyn SessionProvider>,
    settings: SessionSettings,
}

impl SessionManager {
    #[must_use]
    pub fn new(provider: Arc<dyn SessionProvider>, settings: SessionSettings) -> Self {
        Self { provider, settings }
    }

    #[must_use]
    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Load `url` in a fresh session and run `extract` over the rendered DOM.
    ///
    /// `extract` runs after navigation and the randomized delay, before the
    /// session is released. The session is released exactly once on every
    /// path after a successful acquire, including timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the browser cannot be launched, navigation
    /// or content retrieval fails, or the whole sequence exceeds the
    /// configured timeout.
    pub async fn scrape_page<T, F>(&self, url: &str, extract: F) -> Result<T, SessionError>
    where
        F: FnOnce(&Html) -> T + Send,
        T: Send,
    {
        let mut session = self.provider.acquire().await?;
        tracing::debug!(url, "browser session acquired");

        let page_delay = self.settings.page_delay;
        let work = async {
            session.navigate(url).await?;
            random_delay(page_delay).await;
            let html = session.content().await?;
            let document = Html::parse_document(&html);
            Ok::<T, SessionError>(extract(&document))
        };

        let outcome = tokio::time::timeout(self.settings.scrape_timeout, work).await;

        session.release().await;
        tracing::debug!(url, "browser session released");

        match outcome {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout {
                url: url.to_string(),
                timeout_secs: self.settings.scrape_timeout.as_secs(),
            }),
        }
    }
}
