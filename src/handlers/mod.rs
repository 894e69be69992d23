// src/handlers/mod.rs
pub mod error;
pub mod listings;
pub mod summary;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::Strategy;
use crate::services::store::ListingFilter;
use self::error::ApiError;

/// Investment amount assumed when none is supplied (10 million won).
const DEFAULT_INVESTMENT_AMOUNT: f64 = 10_000_000.0;

/// Query parameters shared by the listings and summary endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub competition_rate: Option<f64>,
    pub method: Option<String>,
    pub investment_amount: Option<f64>,
    pub from: Option<NaiveDate>,
}

impl DashboardQuery {
    /// Resolve the subscription strategy, validating its parameters once at
    /// the API boundary.
    pub fn strategy(&self) -> Result<Strategy, ApiError> {
        match self.method.as_deref().unwrap_or("equal") {
            "equal" => Ok(Strategy::Equal),
            "proportional" => {
                let investment_amount =
                    self.investment_amount.unwrap_or(DEFAULT_INVESTMENT_AMOUNT);
                if investment_amount < 0.0 {
                    return Err(ApiError::bad_request(
                        "investment_amount must be non-negative",
                    ));
                }
                Ok(Strategy::Proportional { investment_amount })
            }
            other => Err(ApiError::bad_request(format!(
                "unknown subscription method '{}', expected 'equal' or 'proportional'",
                other
            ))),
        }
    }

    pub fn filter(&self) -> ListingFilter {
        let default = ListingFilter::default();
        ListingFilter {
            min_listing_date: self.from.unwrap_or(default.min_listing_date),
            min_competition_rate: self
                .competition_rate
                .unwrap_or(default.min_competition_rate),
        }
    }
}
