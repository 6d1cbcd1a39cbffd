use pricewatch_core::{ProductStore, ScrapedProduct, StoreError};

/// Stored offers whose title contains `title_query` (ignoring case), cheapest
/// first. Offers at the same price keep the store's order.
///
/// # Errors
///
/// Returns [`StoreError`] if the store query fails. No matches is `Ok(vec![])`.
pub async fn find_best_offers(
    store: &dyn ProductStore,
    title_query: &str,
) -> Result<Vec<ScrapedProduct>, StoreError> {
    let mut offers = store.find_by_title(title_query.trim()).await?;
    offers.sort_by(|a, b| a.price.total_cmp(&b.price));
    Ok(offers)
}
