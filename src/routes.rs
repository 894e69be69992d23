// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;

use log::info;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::{ApiError, ApiErrorKind};
use crate::handlers::{listings::get_listings, summary::get_summary, DashboardQuery};
use crate::services::store::StoreClient;

// Recovery handling for our custom errors
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = match api_error.kind {
            ApiErrorKind::BadRequest => warp::http::StatusCode::BAD_REQUEST,
            ApiErrorKind::Upstream => warp::http::StatusCode::BAD_GATEWAY,
        };
        message = api_error.message.clone();
    } else if let Some(invalid) = err.find::<warp::reject::InvalidQuery>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = invalid.to_string();
    } else {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    store: Arc<StoreClient>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let store_filter = warp::any().map(move || store.clone());

    let listings_route = warp::path!("api" / "v1" / "listings")
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(store_filter.clone())
        .and_then(get_listings);

    let summary_route = warp::path!("api" / "v1" / "summary")
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(store_filter.clone())
        .and_then(get_summary);

    info!("All routes configured successfully.");

    listings_route.or(summary_route).recover(handle_rejection)
}
