// src/services/store.rs
use anyhow::Context;
use chrono::NaiveDate;
use log::info;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::fmt;

use crate::models::{ListingRecord, UnderwriterTerm};

const LISTINGS_TABLE: &str = "stocks_paststock";
const HISTORICAL_TERMS_TABLE: &str = "stocks_paststocksecuritiesfirm";
const LIVE_STOCKS_TABLE: &str = "stocks_stock";
const LIVE_TERMS_TABLE: &str = "stocks_stocksecuritiesfirm";

#[derive(Debug)]
pub enum StoreError {
    /// Network or query failure against the data store.
    Fetch(String),
    /// A fetched record is missing (or has an unreadable) required field.
    SchemaMismatch {
        field: &'static str,
        available: Vec<String>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::Fetch(msg) => write!(f, "data store request failed: {}", msg),
            StoreError::SchemaMismatch { field, available } => write!(
                f,
                "required field '{}' missing or invalid in fetched record; available fields: [{}]",
                field,
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Fetch(err.to_string())
    }
}

/// Connection settings for the hosted data store, assembled at process
/// start and handed to the client constructor.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
}

impl StoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = env::var("SUPABASE_URL").context("SUPABASE_URL not set")?;
        let key = env::var("SUPABASE_KEY").context("SUPABASE_KEY not set")?;
        Ok(StoreConfig { url, key })
    }
}

/// Server-side predicates applied when fetching listings.
#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub min_listing_date: NaiveDate,
    pub min_competition_rate: f64,
}

impl Default for ListingFilter {
    fn default() -> Self {
        ListingFilter {
            // Dashboard covers listings from 2024 onwards.
            min_listing_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            min_competition_rate: 300.0,
        }
    }
}

/// Lightweight listing reference used by the backfill job.
#[derive(Debug, Clone)]
pub struct ListingRef {
    pub id: i64,
    pub name: String,
    pub stock_code: String,
}

/// REST client for the Supabase (PostgREST) tables.
pub struct StoreClient {
    client: Client,
    base_url: String,
    key: String,
}

impl StoreClient {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;
        Ok(StoreClient {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn get_rows(&self, table: &str, params: &[(&str, String)]) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Fetch(format!(
                "query against '{}' returned {}: {}",
                table, status, body
            )));
        }

        Ok(resp.json().await?)
    }

    /// Listings matching the server-side filter predicates. Rows without a
    /// recorded initial price are excluded at the store.
    pub async fn fetch_listings(&self, filter: &ListingFilter) -> Result<Vec<ListingRecord>, StoreError> {
        let params = [
            ("select", "*".to_string()),
            ("listing_date", format!("gte.{}", filter.min_listing_date)),
            ("initial_price", "gte.0".to_string()),
            (
                "institutional_competition_rate",
                format!("gte.{}", filter.min_competition_rate),
            ),
        ];
        let rows = self.get_rows(LISTINGS_TABLE, &params).await?;
        info!("Fetched {} listing rows from {}", rows.len(), LISTINGS_TABLE);
        rows.iter().map(decode_listing).collect()
    }

    /// All historical underwriter term rows.
    pub async fn fetch_underwriter_terms(&self) -> Result<Vec<UnderwriterTerm>, StoreError> {
        let params = [("select", "*".to_string())];
        let rows = self.get_rows(HISTORICAL_TERMS_TABLE, &params).await?;
        info!(
            "Fetched {} underwriter term rows from {}",
            rows.len(),
            HISTORICAL_TERMS_TABLE
        );
        rows.iter().map(decode_underwriter_term).collect()
    }

    /// Historical listings with id at or above the threshold, for backfill.
    pub async fn fetch_listing_refs_from(&self, min_id: i64) -> Result<Vec<ListingRef>, StoreError> {
        let params = [
            ("select", "id,name,stock_code".to_string()),
            ("id", format!("gte.{}", min_id)),
            ("order", "id.asc".to_string()),
        ];
        let rows = self.get_rows(LISTINGS_TABLE, &params).await?;
        rows.iter()
            .map(|row| {
                Ok(ListingRef {
                    id: require_i64(row, "id")?,
                    name: require_str(row, "name")?,
                    stock_code: require_str(row, "stock_code")?,
                })
            })
            .collect()
    }

    /// Id of the live stock with the given code, if one exists.
    pub async fn find_live_stock_id(&self, stock_code: &str) -> Result<Option<i64>, StoreError> {
        let params = [
            ("select", "id".to_string()),
            ("stock_code", format!("eq.{}", stock_code)),
        ];
        let rows = self.get_rows(LIVE_STOCKS_TABLE, &params).await?;
        rows.first().map(|row| require_i64(row, "id")).transpose()
    }

    /// Underwriter terms for one stock from the live table.
    pub async fn fetch_live_terms(&self, live_stock_id: i64) -> Result<Vec<UnderwriterTerm>, StoreError> {
        let params = [
            ("select", "*".to_string()),
            ("stock_id", format!("eq.{}", live_stock_id)),
        ];
        let rows = self.get_rows(LIVE_TERMS_TABLE, &params).await?;
        rows.iter().map(decode_underwriter_term).collect()
    }

    /// Remove all historical term rows for one listing.
    pub async fn delete_historical_terms(&self, stock_id: i64) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.table_url(HISTORICAL_TERMS_TABLE))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .query(&[("stock_id", format!("eq.{}", stock_id))])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Fetch(format!(
                "delete against '{}' returned {}: {}",
                HISTORICAL_TERMS_TABLE, status, body
            )));
        }
        Ok(())
    }

    /// Insert one term row into the historical table, re-pointed at the
    /// given historical listing id.
    pub async fn insert_historical_term(
        &self,
        historical_stock_id: i64,
        term: &UnderwriterTerm,
    ) -> Result<(), StoreError> {
        let body = json!({
            "stock_id": historical_stock_id,
            "securitiesfirm_id": term.securities_firm_id,
            "equality_distribution_number_per_person": term.equal_shares_per_applicant,
            "proportional_distribution_ratio": term.proportional_ratio,
            "number_of_distributed_shares": term.distributed_shares,
            "base_time": term.base_time,
            "minimum_equal_amount": term.minimum_equal_amount,
            "minimum_equal_quantity": term.minimum_equal_quantity,
            "proportional_amount_for_one_share": term.proportional_amount_per_share,
            "number_of_applicants": term.applicant_count,
        });

        let resp = self
            .client
            .post(self.table_url(HISTORICAL_TERMS_TABLE))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Fetch(format!(
                "insert into '{}' returned {}: {}",
                HISTORICAL_TERMS_TABLE, status, body
            )));
        }
        Ok(())
    }
}

fn available_fields(row: &Value) -> Vec<String> {
    row.as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

fn missing(row: &Value, field: &'static str) -> StoreError {
    StoreError::SchemaMismatch {
        field,
        available: available_fields(row),
    }
}

fn require_i64(row: &Value, field: &'static str) -> Result<i64, StoreError> {
    row.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| missing(row, field))
}

fn require_f64(row: &Value, field: &'static str) -> Result<f64, StoreError> {
    row.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| missing(row, field))
}

fn require_str(row: &Value, field: &'static str) -> Result<String, StoreError> {
    row.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(row, field))
}

fn require_date(row: &Value, field: &'static str) -> Result<NaiveDate, StoreError> {
    // Dates arrive as "2024-03-01" or with a trailing time component.
    row.get(field)
        .and_then(Value::as_str)
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| missing(row, field))
}

fn opt_f64(row: &Value, field: &str) -> Option<f64> {
    row.get(field).and_then(Value::as_f64)
}

fn opt_i64(row: &Value, field: &str) -> Option<i64> {
    row.get(field).and_then(Value::as_i64)
}

fn opt_str(row: &Value, field: &str) -> Option<String> {
    row.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Decode one listing row, failing fast when a required field is absent.
pub fn decode_listing(row: &Value) -> Result<ListingRecord, StoreError> {
    Ok(ListingRecord {
        id: require_i64(row, "id")?,
        name: require_str(row, "name")?,
        stock_code: require_str(row, "stock_code")?,
        listing_date: require_date(row, "listing_date")?,
        offer_price: require_f64(row, "offer_price")?,
        initial_price: opt_f64(row, "initial_price"),
        return_rate: opt_f64(row, "return_rate"),
        institutional_competition_rate: opt_f64(row, "institutional_competition_rate"),
        profit_amount: opt_f64(row, "profit_amount"),
    })
}

/// Decode one underwriter term row; only the join key is required.
pub fn decode_underwriter_term(row: &Value) -> Result<UnderwriterTerm, StoreError> {
    Ok(UnderwriterTerm {
        stock_id: require_i64(row, "stock_id")?,
        securities_firm_id: opt_i64(row, "securitiesfirm_id"),
        equal_shares_per_applicant: opt_f64(row, "equality_distribution_number_per_person"),
        proportional_ratio: opt_f64(row, "proportional_distribution_ratio"),
        distributed_shares: opt_i64(row, "number_of_distributed_shares"),
        minimum_equal_amount: opt_f64(row, "minimum_equal_amount"),
        minimum_equal_quantity: opt_i64(row, "minimum_equal_quantity"),
        proportional_amount_per_share: opt_f64(row, "proportional_amount_for_one_share"),
        applicant_count: opt_i64(row, "number_of_applicants"),
        base_time: opt_str(row, "base_time"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_listing_row() {
        let row = json!({
            "id": 250,
            "name": "에이펙스",
            "stock_code": "123456",
            "listing_date": "2024-03-01",
            "offer_price": 10000,
            "initial_price": 15000.0,
            "return_rate": 50.0,
            "institutional_competition_rate": 850.5,
            "profit_amount": 500.0,
        });

        let listing = decode_listing(&row).unwrap();
        assert_eq!(listing.id, 250);
        assert_eq!(listing.listing_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(listing.offer_price, 10000.0);
        assert_eq!(listing.profit_amount, Some(500.0));
    }

    #[test]
    fn decodes_listing_date_with_time_component() {
        let row = json!({
            "id": 1,
            "name": "x",
            "stock_code": "000001",
            "listing_date": "2024-03-01T00:00:00",
            "offer_price": 1.0,
        });

        let listing = decode_listing(&row).unwrap();
        assert_eq!(listing.listing_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(listing.initial_price, None);
    }

    #[test]
    fn missing_required_field_lists_available_fields() {
        let row = json!({
            "name": "x",
            "stock_code": "000001",
        });

        let err = decode_listing(&row).unwrap_err();
        match err {
            StoreError::SchemaMismatch { field, available } => {
                assert_eq!(field, "id");
                assert!(available.contains(&"name".to_string()));
                assert!(available.contains(&"stock_code".to_string()));
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn term_requires_only_join_key() {
        let row = json!({ "stock_id": 42 });
        let term = decode_underwriter_term(&row).unwrap();
        assert_eq!(term.stock_id, 42);
        assert_eq!(term.equal_shares_per_applicant, None);
        assert_eq!(term.proportional_ratio, None);
    }

    #[test]
    fn term_without_join_key_is_a_schema_mismatch() {
        let row = json!({ "equality_distribution_number_per_person": 10.0 });
        let err = decode_underwriter_term(&row).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { field: "stock_id", .. }));
    }

    #[test]
    fn null_fields_decode_as_none() {
        let row = json!({
            "stock_id": 7,
            "proportional_distribution_ratio": null,
            "equality_distribution_number_per_person": 12.5,
        });
        let term = decode_underwriter_term(&row).unwrap();
        assert_eq!(term.proportional_ratio, None);
        assert_eq!(term.equal_shares_per_applicant, Some(12.5));
    }
}
