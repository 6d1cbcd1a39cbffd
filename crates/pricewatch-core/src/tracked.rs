use std::collections::HashSet;

use indexmap::IndexMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::SourceSite;
use crate::ConfigError;

/// A product watched across marketplaces. Sites mapped to `None` (or to a
/// blank string) are declared but not scraped. Sites keep the order they
/// are listed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProductEntry {
    pub name: String,
    #[serde(default)]
    pub urls: IndexMap<SourceSite, Option<String>>,
}

impl TrackedProductEntry {
    /// The `(site, url)` pairs that should actually be scraped, in listed order.
    pub fn scrape_targets(&self) -> impl Iterator<Item = (SourceSite, &str)> {
        self.urls.iter().filter_map(|(site, url)| {
            url.as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|u| (*site, u))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProductsFile {
    #[serde(default)]
    pub products: Vec<TrackedProductEntry>,
}

impl TrackedProductsFile {
    /// Case-insensitive lookup by product name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TrackedProductEntry> {
        let wanted = name.trim().to_lowercase();
        self.products
            .iter()
            .find(|p| p.name.trim().to_lowercase() == wanted)
    }

    /// Append `entry` and re-validate the whole list.
    ///
    /// Unlike [`load_tracked_products`], every URL of the new entry must
    /// resolve to the site it is listed under.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the entry is invalid or its name
    /// is already tracked. The list is left unchanged on error.
    pub fn add_product(&mut self, entry: TrackedProductEntry) -> Result<(), ConfigError> {
        validate_entry_urls(&entry)?;
        self.products.push(entry);
        if let Err(e) = validate_tracked_products(self) {
            self.products.pop();
            return Err(e);
        }
        Ok(())
    }
}

/// Load and validate the tracked products list from a YAML file.
///
/// Only the list structure is checked here. A URL that does not match its
/// site is left for the batch run to report on its own.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tracked_products(path: &Path) -> Result<TrackedProductsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TrackedProductsIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: TrackedProductsFile = serde_yaml::from_str(&content)?;
    validate_tracked_products(&file)?;
    Ok(file)
}

/// Add `entry` to the YAML file at `path`, creating the file if it does not
/// exist yet.
///
/// # Errors
///
/// Returns `ConfigError` if the existing file is unreadable or invalid, the
/// new entry fails validation, or the file cannot be written back.
pub fn append_tracked_product(
    path: &Path,
    entry: TrackedProductEntry,
) -> Result<TrackedProductsFile, ConfigError> {
    let mut file = if path.exists() {
        load_tracked_products(path)?
    } else {
        TrackedProductsFile::default()
    };

    file.add_product(entry)?;

    let rendered = serde_yaml::to_string(&file)?;
    std::fs::write(path, rendered).map_err(|e| ConfigError::TrackedProductsIo {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(file)
}

fn validate_tracked_products(file: &TrackedProductsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for entry in &file.products {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tracked product name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(entry.name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate tracked product: '{}'",
                entry.name
            )));
        }
    }

    Ok(())
}

fn validate_entry_urls(entry: &TrackedProductEntry) -> Result<(), ConfigError> {
    for (site, url) in entry.scrape_targets() {
        if SourceSite::from_url(url) != Some(site) {
            return Err(ConfigError::Validation(format!(
                "tracked product '{}' lists {url} under {site}, but that URL does not \
                 resolve to {site}",
                entry.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tracked_test.rs"]
mod tests;
