//! Print recently posted listings from the store as JSON lines
//!
//! Uses the same configuration as the ingester. Optional positional
//! arguments override the look-back window and the row limit.
//!
//! Run with: cargo run --bin recent_listings -- [DAYS_BACK] [LIMIT]

use std::io::Write;

use anyhow::{Context, Result};

use nomera_ingest_lib::domain::{CarNumberRepository, RecentListingsQuery};
use nomera_ingest_lib::infrastructure::{
    AppConfig, DatabaseConnection, PostgresCarNumberRepository,
};

fn query_from_args(args: &[String]) -> Result<RecentListingsQuery> {
    let mut query = RecentListingsQuery::default();
    if let Some(days) = args.first() {
        query.days_back = days
            .parse()
            .with_context(|| format!("DAYS_BACK must be a non-negative integer, got {days:?}"))?;
    }
    if let Some(limit) = args.get(1) {
        query.limit = Some(
            limit
                .parse()
                .with_context(|| format!("LIMIT must be a non-negative integer, got {limit:?}"))?,
        );
    }
    Ok(query)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let query = query_from_args(&args)?;

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = DatabaseConnection::connect(&config.database).await?;
    let repository = PostgresCarNumberRepository::new(db.pool().clone());

    let listings = repository.find_recent(&query).await;
    db.close().await;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for listing in listings? {
        serde_json::to_writer(&mut out, &listing)?;
        writeln!(out)?;
    }
    Ok(())
}
