//! Headless Chrome implementation of [`SessionProvider`].
//!
//! `headless_chrome` is a blocking driver, so every call into it runs on the
//! blocking thread pool.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::SessionError;
use crate::session::{BrowserSession, SessionProvider};

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

const BASE_VIEWPORT: (u32, u32) = (1366, 768);
const VIEWPORT_JITTER: u32 = 100;

const LAUNCH_ARGS: [&str; 4] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
];

/// Pick one entry from the user-agent pool.
pub(crate) fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Base viewport plus a random `0..=99` pixels on each axis.
pub(crate) fn random_viewport() -> (u32, u32) {
    let mut rng = rand::rng();
    (
        BASE_VIEWPORT.0 + rng.random_range(0..VIEWPORT_JITTER),
        BASE_VIEWPORT.1 + rng.random_range(0..VIEWPORT_JITTER),
    )
}

#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    /// Browser binary; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    /// Per-call timeout applied to the tab (navigation waits, DOM reads).
    pub tab_timeout: Option<Duration>,
}

/// Launches a fresh, sandbox-disabled headless browser per acquisition.
#[derive(Debug, Clone, Default)]
pub struct ChromeSessionProvider {
    options: ChromeOptions,
}

impl ChromeSessionProvider {
    #[must_use]
    pub fn new(options: ChromeOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionProvider for ChromeSessionProvider {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let options = self.options.clone();
        let (browser, tab) = tokio::task::spawn_blocking(move || launch(&options))
            .await
            .map_err(|e| SessionError::Launch {
                reason: e.to_string(),
            })??;

        Ok(Box::new(ChromeSession {
            inner: Some((browser, tab)),
            url: String::new(),
        }))
    }
}

#[allow(clippy::needless_pass_by_value)]
fn launch_err(e: anyhow::Error) -> SessionError {
    SessionError::Launch {
        reason: format!("{e:#}"),
    }
}

fn launch(options: &ChromeOptions) -> Result<(Browser, Arc<Tab>), SessionError> {
    let user_agent = pick_user_agent();
    let viewport = random_viewport();
    let ua_arg = format!("--user-agent={user_agent}");

    let mut args: Vec<&OsStr> = LAUNCH_ARGS.iter().map(OsStr::new).collect();
    args.push(OsStr::new(&ua_arg));

    let browser = Browser::new(LaunchOptions {
        headless: true,
        sandbox: false,
        window_size: Some(viewport),
        path: options.chrome_path.clone(),
        args,
        ..Default::default()
    })
    .map_err(launch_err)?;

    let tab = browser.new_tab().map_err(launch_err)?;

    if let Some(timeout) = options.tab_timeout {
        tab.set_default_timeout(timeout);
    }

    tab.set_user_agent(user_agent, Some(ACCEPT_LANGUAGE), None)
        .map_err(launch_err)?;

    let headers = HashMap::from([("Accept", ACCEPT), ("Accept-Language", ACCEPT_LANGUAGE)]);
    tab.set_extra_http_headers(headers)
        .map_err(launch_err)?;

    tracing::debug!(
        user_agent,
        width = viewport.0,
        height = viewport.1,
        "launched headless browser"
    );

    Ok((browser, tab))
}

struct ChromeSession {
    /// `None` once released. Dropping the `Browser` terminates the process.
    inner: Option<(Browser, Arc<Tab>)>,
    /// Last URL handed to `navigate`, for error context.
    url: String,
}

impl ChromeSession {
    fn tab(&self, url: &str) -> Result<Arc<Tab>, SessionError> {
        self.inner
            .as_ref()
            .map(|(_, tab)| Arc::clone(tab))
            .ok_or_else(|| SessionError::Navigation {
                url: url.to_string(),
                reason: "session already released".to_string(),
            })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        let tab = self.tab(url)?;
        self.url = url.to_string();
        let target = url.to_string();
        let nav_err = |reason: String| SessionError::Navigation {
            url: url.to_string(),
            reason,
        };

        tokio::task::spawn_blocking(move || {
            tab.navigate_to(&target)?.wait_until_navigated()?;
            Ok::<(), anyhow::Error>(())
        })
        .await
        .map_err(|e| nav_err(e.to_string()))?
        .map_err(|e| nav_err(format!("{e:#}")))
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        let url = self.url.clone();
        let tab = self.tab(&url)?;

        tokio::task::spawn_blocking(move || tab.get_content())
            .await
            .map_err(|e| SessionError::Content {
                url: url.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| SessionError::Content {
                url,
                reason: format!("{e:#}"),
            })
    }

    async fn release(&mut self) {
        let Some((browser, tab)) = self.inner.take() else {
            return;
        };

        let closed = tokio::task::spawn_blocking(move || {
            let result = tab.close(true);
            drop(tab);
            drop(browser);
            result
        })
        .await;

        match closed {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %format!("{e:#}"), "page did not close cleanly; browser dropped");
            }
            Err(e) => {
                tracing::warn!(error = %e, "browser teardown task failed");
            }
        }
    }
}
