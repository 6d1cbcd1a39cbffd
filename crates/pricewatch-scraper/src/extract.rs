//! Field-level extraction over a rendered product page.
//!
//! Each field is read independently and reports a [`FieldMiss`] instead of
//! failing the page. [`extract_fields`] collapses misses to the field's
//! default, so one broken selector never loses the rest of the record.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use pricewatch_core::{ScrapedProduct, SourceSite, StockStatus};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.]").expect("valid non-numeric regex"));

const OUT_OF_STOCK_MARKERS: [&str; 4] = [
    "out of stock",
    "unavailable",
    "sold out",
    "no longer available",
];

/// Why a single field could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMiss {
    /// The CSS selector did not parse.
    BadSelector,
    /// No element matched, or it had no usable text/attribute.
    Missing,
    /// Text was present but could not be interpreted.
    Unparseable,
}

/// CSS selectors for one marketplace's product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteSelectors {
    pub title: &'static str,
    pub price: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    /// Attribute on the image element that carries the URL.
    pub image_attr: &'static str,
    pub availability: &'static str,
    /// One element per key/value row of the specifications table.
    pub spec_row: &'static str,
    /// Key cell, relative to a row.
    pub spec_key: &'static str,
    /// Value cell, relative to a row.
    pub spec_value: &'static str,
}

/// Everything read from the page, with misses already defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub title: String,
    pub price: f64,
    pub description: String,
    pub image_url: String,
    pub stock_status: StockStatus,
    pub specifications: BTreeMap<String, String>,
}

impl ExtractedFields {
    #[must_use]
    pub fn into_product(
        self,
        source_url: &str,
        source_site: SourceSite,
        timestamp: DateTime<Utc>,
    ) -> ScrapedProduct {
        ScrapedProduct {
            id: None,
            title: self.title,
            price: self.price,
            description: self.description,
            image_url: self.image_url,
            source_url: source_url.to_string(),
            source_site,
            affiliate_url: None,
            timestamp,
            specifications: self.specifications,
            availability: self.stock_status == StockStatus::InStock,
            stock_status: self.stock_status,
            rating: None,
            review_count: None,
        }
    }
}

/// Read every field of `selectors` from `document`.
#[must_use]
pub fn extract_fields(document: &Html, selectors: &SiteSelectors) -> ExtractedFields {
    ExtractedFields {
        title: or_default("title", extract_text(document, selectors.title)),
        price: or_default("price", extract_price(document, selectors.price)),
        description: or_default(
            "description",
            extract_text(document, selectors.description),
        ),
        image_url: or_default(
            "image_url",
            extract_attr(document, selectors.image, selectors.image_attr),
        ),
        stock_status: or_default(
            "availability",
            extract_stock_status(document, selectors.availability),
        ),
        specifications: or_default("specifications", extract_specifications(document, selectors)),
    }
}

fn or_default<T: Default>(field: &'static str, result: Result<T, FieldMiss>) -> T {
    result.unwrap_or_else(|miss| {
        tracing::debug!(field, ?miss, "field missing; using default");
        T::default()
    })
}

fn parse_selector(css: &str) -> Result<Selector, FieldMiss> {
    Selector::parse(css).map_err(|_| FieldMiss::BadSelector)
}

/// Text nodes are concatenated as the DOM renders them, so adjacent inline
/// elements are not split apart. Runs of whitespace then collapse to one space.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed, whitespace-collapsed text of the first match.
///
/// # Errors
///
/// [`FieldMiss::Missing`] when nothing matches or the text is blank.
pub fn extract_text(document: &Html, css: &str) -> Result<String, FieldMiss> {
    let selector = parse_selector(css)?;
    let text = document
        .select(&selector)
        .next()
        .map(element_text)
        .ok_or(FieldMiss::Missing)?;
    if text.is_empty() {
        return Err(FieldMiss::Missing);
    }
    Ok(text)
}

/// Trimmed value of `attr` on the first match.
///
/// # Errors
///
/// [`FieldMiss::Missing`] when nothing matches or the attribute is absent or blank.
pub fn extract_attr(document: &Html, css: &str, attr: &str) -> Result<String, FieldMiss> {
    let selector = parse_selector(css)?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(FieldMiss::Missing)
}

/// # Errors
///
/// Propagates misses from [`extract_text`] and [`parse_price`].
pub fn extract_price(document: &Html, css: &str) -> Result<f64, FieldMiss> {
    parse_price(&extract_text(document, css)?)
}

/// Parse a display price such as `"$1,299.99"`.
///
/// Everything except digits and `.` is stripped first. The longest leading
/// run that forms a number (at most one `.`) is then parsed, so `"699."`
/// yields `699.0` and `"1.2.3"` yields `1.2`.
///
/// # Errors
///
/// [`FieldMiss::Unparseable`] when no digits remain.
pub fn parse_price(raw: &str) -> Result<f64, FieldMiss> {
    let stripped = NON_NUMERIC.replace_all(raw, "");

    let mut seen_dot = false;
    let end = stripped
        .char_indices()
        .find(|&(_, c)| {
            if c == '.' {
                if seen_dot {
                    return true;
                }
                seen_dot = true;
            }
            false
        })
        .map_or(stripped.len(), |(i, _)| i);
    let numeric = &stripped[..end];

    if !numeric.chars().any(|c| c.is_ascii_digit()) {
        return Err(FieldMiss::Unparseable);
    }

    numeric
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or(FieldMiss::Unparseable)
}

/// Classify availability text.
///
/// "in stock" anywhere wins; otherwise known out-of-stock phrases map to
/// [`StockStatus::OutOfStock`]; anything else is [`StockStatus::Unknown`].
#[must_use]
pub fn classify_stock(text: &str) -> StockStatus {
    let lower = text.to_lowercase();
    if lower.contains("in stock") {
        StockStatus::InStock
    } else if OUT_OF_STOCK_MARKERS.iter().any(|m| lower.contains(m)) {
        StockStatus::OutOfStock
    } else {
        StockStatus::Unknown
    }
}

/// # Errors
///
/// Propagates misses from [`extract_text`].
pub fn extract_stock_status(document: &Html, css: &str) -> Result<StockStatus, FieldMiss> {
    extract_text(document, css).map(|text| classify_stock(&text))
}

/// Key/value rows of the specifications table. Rows where either cell is
/// missing or blank are skipped; a later duplicate key overwrites an
/// earlier one.
///
/// # Errors
///
/// [`FieldMiss::BadSelector`] if any of the three selectors does not parse.
pub fn extract_specifications(
    document: &Html,
    selectors: &SiteSelectors,
) -> Result<BTreeMap<String, String>, FieldMiss> {
    let row_sel = parse_selector(selectors.spec_row)?;
    let key_sel = parse_selector(selectors.spec_key)?;
    let value_sel = parse_selector(selectors.spec_value)?;

    let mut specs = BTreeMap::new();
    for row in document.select(&row_sel) {
        let key = row.select(&key_sel).next().map(element_text);
        let value = row.select(&value_sel).next().map(element_text);
        if let (Some(key), Some(value)) = (key, value) {
            if !key.is_empty() && !value.is_empty() {
                specs.insert(key, value);
            }
        }
    }
    Ok(specs)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
