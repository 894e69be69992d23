// src/handlers/listings.rs
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::handlers::error::ApiError;
use crate::handlers::DashboardQuery;
use crate::models::{EnrichedListing, Strategy};
use crate::services::pipeline;
use crate::services::store::StoreClient;

#[derive(Serialize)]
struct ListingsResponse {
    method: &'static str,
    profit_label: &'static str,
    investment_amount: Option<f64>,
    listings: Vec<EnrichedListing>,
}

pub async fn get_listings(
    query: DashboardQuery,
    store: Arc<StoreClient>,
) -> Result<Json, Rejection> {
    info!("Handling request for ranked listings: {:?}", query);

    let strategy = query.strategy().map_err(warp::reject::custom)?;
    let filter = query.filter();

    let listings = pipeline::run(&store, &filter, &strategy).await.map_err(|e| {
        error!("Pipeline run failed: {}", e);
        warp::reject::custom(ApiError::upstream(e.to_string()))
    })?;

    let investment_amount = match strategy {
        Strategy::Proportional { investment_amount } => Some(investment_amount),
        Strategy::Equal => None,
    };

    Ok(warp::reply::json(&ListingsResponse {
        method: strategy.method_name(),
        profit_label: strategy.profit_label(),
        investment_amount,
        listings,
    }))
}
