// src/services/pipeline.rs
use log::info;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{BestTerm, EnrichedListing, ListingRecord, Strategy, UnderwriterTerm};
use crate::services::store::{ListingFilter, StoreClient, StoreError};

/// One full dashboard pipeline run: fetch, aggregate, merge, derive, rank.
/// The two fetches are issued sequentially; everything after them is pure.
pub async fn run(
    store: &StoreClient,
    filter: &ListingFilter,
    strategy: &Strategy,
) -> Result<Vec<EnrichedListing>, StoreError> {
    let listings = store.fetch_listings(filter).await?;
    let terms = store.fetch_underwriter_terms().await?;
    info!(
        "Pipeline run over {} listings and {} underwriter rows",
        listings.len(),
        terms.len()
    );

    let best = best_terms(&terms);
    let mut rows = merge(listings, &best);
    derive_profit(&mut rows, strategy);
    rank(&mut rows, strategy);
    Ok(rows)
}

/// Best terms per listing: maximum equal shares per applicant, minimum
/// proportional ratio, over the values present in each group. Empty input
/// yields an empty map.
pub fn best_terms(terms: &[UnderwriterTerm]) -> HashMap<i64, BestTerm> {
    let mut best: HashMap<i64, BestTerm> = HashMap::new();
    for term in terms {
        let entry = best.entry(term.stock_id).or_default();
        if let Some(shares) = term.equal_shares_per_applicant {
            entry.equal_shares_per_applicant = Some(match entry.equal_shares_per_applicant {
                Some(current) => current.max(shares),
                None => shares,
            });
        }
        if let Some(ratio) = term.proportional_ratio {
            entry.proportional_ratio = Some(match entry.proportional_ratio {
                Some(current) => current.min(ratio),
                None => ratio,
            });
        }
    }
    best
}

/// Left-join listings with their best terms, preserving cardinality and
/// order. Also derives the two per-listing base figures; profit itself is
/// strategy-dependent and set later.
pub fn merge(listings: Vec<ListingRecord>, best: &HashMap<i64, BestTerm>) -> Vec<EnrichedListing> {
    listings
        .into_iter()
        .map(|listing| {
            let term = best.get(&listing.id).cloned().unwrap_or_default();
            let equality_profit = match (term.equal_shares_per_applicant, listing.profit_amount) {
                (Some(shares), Some(profit)) => Some(shares * profit),
                _ => None,
            };
            let proportional_required_investment = term
                .proportional_ratio
                .map(|ratio| ratio * listing.offer_price / 2.0);

            EnrichedListing {
                id: listing.id,
                name: listing.name,
                stock_code: listing.stock_code,
                listing_date: listing.listing_date,
                offer_price: listing.offer_price,
                initial_price: listing.initial_price,
                return_rate: listing.return_rate,
                institutional_competition_rate: listing.institutional_competition_rate,
                profit_amount: listing.profit_amount,
                equal_shares_per_applicant: term.equal_shares_per_applicant,
                proportional_ratio: term.proportional_ratio,
                equality_profit,
                proportional_required_investment,
                profit: None,
            }
        })
        .collect()
}

/// Set the profit column per the active strategy.
pub fn derive_profit(rows: &mut [EnrichedListing], strategy: &Strategy) {
    for row in rows.iter_mut() {
        row.profit = match *strategy {
            Strategy::Equal => row.equality_profit,
            Strategy::Proportional { investment_amount } => {
                proportional_profit(row, investment_amount)
            }
        };
    }
}

/// Null when the required investment is absent or non-positive: a zero
/// ratio would otherwise divide by zero.
fn proportional_profit(row: &EnrichedListing, investment_amount: f64) -> Option<f64> {
    let required = row.proportional_required_investment?;
    if required <= 0.0 {
        return None;
    }
    let per_share = row.profit_amount?;
    Some(investment_amount / required * per_share + row.equality_profit?)
}

/// Stable sort: listing date descending, then the strategy's secondary key.
/// Rows without terms sort after rows with values on the same date;
/// remaining ties keep insertion order.
pub fn rank(rows: &mut [EnrichedListing], strategy: &Strategy) {
    rows.sort_by(|a, b| {
        b.listing_date.cmp(&a.listing_date).then_with(|| match strategy {
            Strategy::Equal => {
                cmp_desc(a.equal_shares_per_applicant, b.equal_shares_per_applicant)
            }
            Strategy::Proportional { .. } => cmp_asc(a.proportional_ratio, b.proportional_ratio),
        })
    });
}

fn cmp_asc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
