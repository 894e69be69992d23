// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One IPO event, as stored in the historical listings table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: i64,
    pub name: String,
    pub stock_code: String,
    pub listing_date: NaiveDate,
    pub offer_price: f64,
    pub initial_price: Option<f64>,
    pub return_rate: Option<f64>,
    pub institutional_competition_rate: Option<f64>,
    /// Profit per allotted share (initial price minus offer price).
    pub profit_amount: Option<f64>,
}

/// Allocation terms one underwriter offers for one listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwriterTerm {
    pub stock_id: i64,
    pub securities_firm_id: Option<i64>,
    pub equal_shares_per_applicant: Option<f64>,
    pub proportional_ratio: Option<f64>,
    pub distributed_shares: Option<i64>,
    pub minimum_equal_amount: Option<f64>,
    pub minimum_equal_quantity: Option<i64>,
    pub proportional_amount_per_share: Option<f64>,
    pub applicant_count: Option<i64>,
    pub base_time: Option<String>,
}

/// Best terms across all underwriters covering one listing: a subscriber
/// picks the firm offering the most equal shares and the lowest
/// proportional competition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BestTerm {
    pub equal_shares_per_applicant: Option<f64>,
    pub proportional_ratio: Option<f64>,
}

/// A listing left-joined with its best underwriter terms plus the derived
/// profit figures. Null fields mean no underwriter data (or a division
/// hazard) for that listing; the row is still served.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedListing {
    pub id: i64,
    pub name: String,
    pub stock_code: String,
    pub listing_date: NaiveDate,
    pub offer_price: f64,
    pub initial_price: Option<f64>,
    pub return_rate: Option<f64>,
    pub institutional_competition_rate: Option<f64>,
    pub profit_amount: Option<f64>,
    pub equal_shares_per_applicant: Option<f64>,
    pub proportional_ratio: Option<f64>,
    pub equality_profit: Option<f64>,
    pub proportional_required_investment: Option<f64>,
    pub profit: Option<f64>,
}

/// Subscription strategy, fixed once per pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    Equal,
    Proportional { investment_amount: f64 },
}

impl Strategy {
    /// Display label for the profit column, as the dashboard shows it.
    pub fn profit_label(&self) -> &'static str {
        match self {
            Strategy::Equal => "균등 수익금",
            Strategy::Proportional { .. } => "비례 수익금",
        }
    }

    /// Wire name used in API requests and responses.
    pub fn method_name(&self) -> &'static str {
        match self {
            Strategy::Equal => "equal",
            Strategy::Proportional { .. } => "proportional",
        }
    }
}
