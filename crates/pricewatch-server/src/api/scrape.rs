use axum::{extract::State, Extension, Json};
use pricewatch_core::ScrapedProduct;
use pricewatch_scraper::PipelineError;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_pipeline_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeRequest {
    pub url: String,
}

/// Scrape one URL synchronously and store the result.
///
/// A product that was extracted but could not be stored is still returned.
pub(super) async fn scrape_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ScrapeRequest>,
) -> Result<Json<ApiResponse<ScrapedProduct>>, ApiError> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "url must not be empty",
        ));
    }

    let product = match state.dispatcher.dispatch(url).await {
        Ok(product) => product,
        Err(PipelineError::Persistence {
            product, source, ..
        }) => {
            tracing::warn!(url, error = %source, "returning scraped product that was not stored");
            *product
        }
        Err(e) => return Err(map_pipeline_error(req_id.0, &e, "Failed to scrape product")),
    };

    Ok(Json(ApiResponse {
        data: product,
        meta: ResponseMeta::new(req_id.0),
    }))
}
