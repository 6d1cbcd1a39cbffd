use axum::{
    extract::{Path, State},
    Extension, Json,
};
use pricewatch_core::ScrapedProduct;

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Stored offers whose title contains `product_title`, cheapest first.
pub(super) async fn compare_offers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_title): Path<String>,
) -> Result<Json<ApiResponse<Vec<ScrapedProduct>>>, ApiError> {
    let offers =
        pricewatch_scraper::find_best_offers(state.dispatcher.store().as_ref(), &product_title)
            .await
            .map_err(|e| map_store_error(req_id.0.clone(), &e, "Failed to fetch offers"))?;

    Ok(Json(ApiResponse {
        data: offers,
        meta: ResponseMeta::new(req_id.0),
    }))
}
