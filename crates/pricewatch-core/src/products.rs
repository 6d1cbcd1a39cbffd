use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplaces the pipeline knows how to scrape.
///
/// Variant order matches the priority used when a URL mentions more than one
/// marketplace name: see [`SourceSite::from_url`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSite {
    Amazon,
    Ebay,
    Walmart,
    Aliexpress,
}

/// Order in which URL substrings are checked. `aliexpress` is tested before
/// `walmart`, so this differs from the declaration order.
const RESOLUTION_ORDER: [SourceSite; 4] = [
    SourceSite::Amazon,
    SourceSite::Ebay,
    SourceSite::Aliexpress,
    SourceSite::Walmart,
];

impl SourceSite {
    pub const ALL: [SourceSite; 4] = [
        SourceSite::Amazon,
        SourceSite::Ebay,
        SourceSite::Walmart,
        SourceSite::Aliexpress,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceSite::Amazon => "amazon",
            SourceSite::Ebay => "ebay",
            SourceSite::Walmart => "walmart",
            SourceSite::Aliexpress => "aliexpress",
        }
    }

    /// Resolve the marketplace a URL belongs to.
    ///
    /// Matching is a case-insensitive substring test against the whole URL,
    /// so `https://example.com/?ref=amazon` resolves to Amazon. When several
    /// names occur, the first one in `amazon, ebay, aliexpress, walmart`
    /// wins.
    #[must_use]
    pub fn from_url(url: &str) -> Option<SourceSite> {
        let lower = url.to_lowercase();
        RESOLUTION_ORDER
            .into_iter()
            .find(|site| lower.contains(site.as_str()))
    }
}

impl std::fmt::Display for SourceSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source site: {0}")]
pub struct UnknownSite(pub String);

impl FromStr for SourceSite {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amazon" => Ok(SourceSite::Amazon),
            "ebay" => Ok(SourceSite::Ebay),
            "walmart" => Ok(SourceSite::Walmart),
            "aliexpress" => Ok(SourceSite::Aliexpress),
            other => Err(UnknownSite(other.to_string())),
        }
    }
}

/// Stock state read from a product page's availability region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    #[default]
    Unknown,
}

impl StockStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Unknown => "unknown",
        }
    }

    /// Lenient parse used when reading persisted rows. Unrecognised values
    /// map to [`StockStatus::Unknown`].
    #[must_use]
    pub fn parse_lossy(s: &str) -> StockStatus {
        match s {
            "in_stock" => StockStatus::InStock,
            "out_of_stock" => StockStatus::OutOfStock,
            _ => StockStatus::Unknown,
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product page scraped from one marketplace, normalized into the shape
/// shared by every extractor and by the comparison service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedProduct {
    /// Assigned by the store on first write; `None` until persisted.
    pub id: Option<i64>,
    pub title: String,
    /// Non-negative; `0.0` when the price element was missing or unparseable.
    pub price: f64,
    pub description: String,
    pub image_url: String,
    pub source_url: String,
    pub source_site: SourceSite,
    pub affiliate_url: Option<String>,
    /// Capture time of the successful extraction.
    pub timestamp: DateTime<Utc>,
    pub specifications: BTreeMap<String, String>,
    /// `true` only when the stock indicator said "in stock".
    pub availability: bool,
    pub stock_status: StockStatus,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
}

impl ScrapedProduct {
    /// Key used for idempotent upserts: the source URL, or `site:title` when
    /// the URL is blank.
    #[must_use]
    pub fn natural_key(&self) -> String {
        let url = self.source_url.trim();
        if url.is_empty() {
            format!("{}:{}", self.source_site, self.title.trim())
        } else {
            url.to_string()
        }
    }

    /// Case-insensitive substring match on the title.
    #[must_use]
    pub fn title_contains(&self, query: &str) -> bool {
        self.title.to_lowercase().contains(&query.to_lowercase())
    }
}
