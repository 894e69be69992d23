// src/services/summary.rs
use serde::Serialize;
use std::collections::BTreeMap;

use chrono::Datelike;

use crate::models::EnrichedListing;

/// Profit and listing count for one calendar month.
#[derive(Debug, Serialize, PartialEq)]
pub struct MonthlyBucket {
    pub month: u32,
    pub profit: f64,
    pub listing_count: usize,
}

/// Headline figures for the dashboard's metric row and monthly charts.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub listing_count: usize,
    pub average_return_rate: Option<f64>,
    pub total_profit: f64,
    pub monthly: Vec<MonthlyBucket>,
}

/// Aggregate the ranked rows. Null profits and return rates are skipped,
/// not treated as zero, except that a month's bucket still counts its
/// listings.
pub fn summarize(rows: &[EnrichedListing]) -> DashboardSummary {
    let return_rates: Vec<f64> = rows.iter().filter_map(|r| r.return_rate).collect();
    let average_return_rate = if return_rates.is_empty() {
        None
    } else {
        Some(return_rates.iter().sum::<f64>() / return_rates.len() as f64)
    };

    let total_profit: f64 = rows.iter().filter_map(|r| r.profit).sum();

    let mut buckets: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = buckets.entry(row.listing_date.month()).or_insert((0.0, 0));
        entry.0 += row.profit.unwrap_or(0.0);
        entry.1 += 1;
    }
    let monthly = buckets
        .into_iter()
        .map(|(month, (profit, listing_count))| MonthlyBucket {
            month,
            profit,
            listing_count,
        })
        .collect();

    DashboardSummary {
        listing_count: rows.len(),
        average_return_rate,
        total_profit,
        monthly,
    }
}
