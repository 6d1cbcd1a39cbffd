pub mod chrome;
pub mod compare;
pub mod contract;
pub mod error;
pub mod extract;
pub mod persist;
pub mod pipeline;
pub mod retry;
pub mod router;
pub mod session;
pub mod sites;
pub mod tracker;

pub use chrome::{ChromeOptions, ChromeSessionProvider};
pub use compare::find_best_offers;
pub use contract::SiteScraper;
pub use error::{ExtractionError, PersistError, PipelineError, SessionError};
pub use extract::{extract_fields, ExtractedFields, FieldMiss, SiteSelectors};
pub use persist::{normalize_product, Persister};
pub use pipeline::build_dispatcher;
pub use retry::retry_with_backoff;
pub use router::{resolve_site, Dispatcher, ScraperRegistry};
pub use session::{
    random_delay, BrowserSession, DelayRange, SessionManager, SessionProvider, SessionSettings,
};
pub use sites::{default_registry, selectors_for, MarketplaceScraper};
pub use tracker::{plan_targets, track_products, TrackerSettings, TrackingSummary, UrlReport};
