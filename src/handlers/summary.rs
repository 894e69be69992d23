// src/handlers/summary.rs
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::handlers::error::ApiError;
use crate::handlers::DashboardQuery;
use crate::services::pipeline;
use crate::services::store::StoreClient;
use crate::services::summary::{self, DashboardSummary};

#[derive(Serialize)]
struct SummaryResponse {
    method: &'static str,
    profit_label: &'static str,
    #[serde(flatten)]
    summary: DashboardSummary,
}

pub async fn get_summary(
    query: DashboardQuery,
    store: Arc<StoreClient>,
) -> Result<Json, Rejection> {
    info!("Handling request for dashboard summary: {:?}", query);

    let strategy = query.strategy().map_err(warp::reject::custom)?;
    let filter = query.filter();

    let listings = pipeline::run(&store, &filter, &strategy).await.map_err(|e| {
        error!("Pipeline run failed: {}", e);
        warp::reject::custom(ApiError::upstream(e.to_string()))
    })?;

    Ok(warp::reply::json(&SummaryResponse {
        method: strategy.method_name(),
        profit_label: strategy.profit_label(),
        summary: summary::summarize(&listings),
    }))
}
