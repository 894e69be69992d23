// src/bin/sync_underwriters.rs
//
// One-time backfill: copies underwriter terms from the live table into the
// historical table for listings at or above an id threshold, replacing any
// existing historical rows for each listing.
use dotenv::dotenv;
use log::{error, info, warn};
use std::env;

use ipo_dashboard_backend::services::store::{StoreClient, StoreConfig};

const DEFAULT_MIN_STOCK_ID: i64 = 240;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let min_id: i64 = env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(DEFAULT_MIN_STOCK_ID);

    let store = StoreClient::new(StoreConfig::from_env()?)?;

    let targets = store.fetch_listing_refs_from(min_id).await?;
    info!(
        "{} historical listings to sync (id >= {})",
        targets.len(),
        min_id
    );

    for listing in &targets {
        let live_id = match store.find_live_stock_id(&listing.stock_code).await? {
            Some(id) => id,
            None => {
                warn!(
                    "No live stock matches {} (code {}), skipping",
                    listing.name, listing.stock_code
                );
                continue;
            }
        };

        let terms = store.fetch_live_terms(live_id).await?;
        if terms.is_empty() {
            warn!("No underwriter terms for {}, skipping", listing.name);
            continue;
        }

        // Replace, not append: stale historical rows go first.
        store.delete_historical_terms(listing.id).await?;

        let mut inserted = 0;
        for term in &terms {
            match store.insert_historical_term(listing.id, term).await {
                Ok(()) => inserted += 1,
                Err(e) => error!(
                    "Failed to insert term for {}: {} (row: {:?})",
                    listing.name, e, term
                ),
            }
        }
        info!("Synced {}: {} of {} terms", listing.name, inserted, terms.len());
    }

    info!("Underwriter sync complete");
    Ok(())
}
