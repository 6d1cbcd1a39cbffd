use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use pricewatch_core::{JobStore, ScrapingJob};
use pricewatch_scraper::{resolve_site, retry_with_backoff, Dispatcher, TrackerSettings};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct TrackRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TrackingStarted {
    message: &'static str,
    job: ScrapingJob,
}

/// Record a pending job and scrape it in the background.
pub(super) async fn start_tracking(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<TrackRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TrackingStarted>>), ApiError> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "url must not be empty",
        ));
    }
    if let Err(e) = resolve_site(url) {
        return Err(ApiError::new(req_id.0, "bad_request", e.to_string()));
    }

    let job = state
        .jobs
        .create_job(url)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e, "Failed to track product"))?;

    tracing::info!(job_id = %job.id, url, "tracking job queued");

    let background = state.clone();
    let job_id = job.id;
    let product_url = job.product_url.clone();
    tokio::spawn(async move {
        run_tracking_job(
            &background.dispatcher,
            background.jobs.as_ref(),
            &background.tracker,
            job_id,
            &product_url,
        )
        .await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TrackingStarted {
                message: "Product tracking started",
                job,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_tracking_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScrapingJob>>, ApiError> {
    let job = state
        .jobs
        .get_job(job_id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e, "Failed to load tracking job"))?;

    Ok(Json(ApiResponse {
        data: job,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Drive one job through `processing` to `completed` or `failed`.
pub(super) async fn run_tracking_job(
    dispatcher: &Dispatcher,
    jobs: &dyn JobStore,
    settings: &TrackerSettings,
    job_id: Uuid,
    url: &str,
) {
    if let Err(e) = jobs.mark_processing(job_id).await {
        tracing::error!(%job_id, error = %e, "could not start tracking job");
        return;
    }

    let outcome = retry_with_backoff(
        settings.max_retries,
        settings.retry_backoff_base_secs,
        || dispatcher.dispatch(url),
    )
    .await;

    let transition = match outcome {
        Ok(product) => {
            tracing::info!(%job_id, url, price = product.price, "tracking job completed");
            jobs.mark_completed(job_id, product.timestamp).await
        }
        Err(e) => {
            tracing::error!(%job_id, url, error = %e, "tracking job failed");
            jobs.mark_failed(job_id, &e.to_string()).await
        }
    };

    if let Err(e) = transition {
        tracing::error!(%job_id, error = %e, "could not record tracking job outcome");
    }
}
