//! nomera-ingest entry point
//!
//! Composition root: configuration, logging, store, provider, then the
//! ingestion loop until it stops or Ctrl-C arrives.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use nomera_ingest_lib::application::{FetchCarNumbersUseCase, IngestOptions};
use nomera_ingest_lib::domain::CarNumberRepository;
use nomera_ingest_lib::infrastructure::{
    AppConfig, AutoNomeraProvider, DatabaseConnection, PostgresCarNumberRepository,
    init_logging_with_config, log_system_info,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging_with_config(&config.logging)?;
    log_system_info();

    let db = DatabaseConnection::connect(&config.database).await?;
    if config.database.ensure_schema {
        db.ensure_schema().await?;
    }

    let result = run(&config, &db).await;
    db.close().await;

    if let Err(e) = &result {
        error!("Ingestion failed: {:#}", e);
    }
    result
}

async fn run(config: &AppConfig, db: &DatabaseConnection) -> Result<()> {
    let provider = AutoNomeraProvider::new(config.source.clone())?;
    let repository = PostgresCarNumberRepository::new(db.pool().clone());
    let use_case = FetchCarNumbersUseCase::new(
        &provider,
        &repository,
        IngestOptions::from_config(&config.ingest),
    );

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current step");
                cancel.cancel();
            }
        }
    });

    let outcome = use_case.handle(&cancel).await;
    ctrl_c.abort();
    let summary = outcome?;

    info!(
        "Run finished: {} polls, {} listings seen, {} inserted, {} updated, {} skipped rows",
        summary.iterations, summary.records_seen, summary.inserted, summary.updated, summary.skipped
    );
    match repository.count().await {
        Ok(total) => info!("Store now holds {} listings", total),
        Err(e) => warn!("Could not count stored listings: {}", e),
    }
    Ok(())
}
