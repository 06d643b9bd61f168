//! Ingestion loop use case
//!
//! Polls the provider page by page, upserts every parsed listing and stops
//! on the first of: a page with no parsed listings, an optional "nothing
//! new" page, the iteration limit, or cancellation. Fetch and persistence
//! failures end the run with an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    CarNumberRepository, FetchError, ListingBatch, NumberProvider, PageCursor, PersistenceError,
};
use crate::infrastructure::config::IngestConfig;

/// When a successful poll should end the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop once a page yields no parsed listings
    #[default]
    EmptyBatch,
    /// Additionally stop once a page inserted nothing new
    NoNewRows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EmptyBatch,
    NoNewRows,
    IterationLimit,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::EmptyBatch => "empty batch",
            Self::NoNewRows => "no new rows",
            Self::IterationLimit => "iteration limit reached",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Fetching listings failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Persisting listings failed: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub poll_interval: Duration,
    pub max_iterations: Option<u32>,
    pub stop_condition: StopCondition,
    pub start: PageCursor,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_iterations: config.max_iterations,
            stop_condition: config.stop_condition,
            start: PageCursor::first(),
        }
    }
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub iterations: u32,
    pub records_seen: u64,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub stop_reason: Option<StopReason>,
}

/// Per-batch persistence counts
#[derive(Debug, Default, Clone, Copy)]
struct BatchCounts {
    inserted: u64,
    updated: u64,
}

pub struct FetchCarNumbersUseCase<'a> {
    provider: &'a dyn NumberProvider,
    repository: &'a dyn CarNumberRepository,
    options: IngestOptions,
}

impl<'a> FetchCarNumbersUseCase<'a> {
    pub fn new(
        provider: &'a dyn NumberProvider,
        repository: &'a dyn CarNumberRepository,
        options: IngestOptions,
    ) -> Self {
        Self {
            provider,
            repository,
            options,
        }
    }

    /// Run the loop until a stop condition or an error
    pub async fn handle(&self, cancel: &CancellationToken) -> Result<IngestSummary, IngestError> {
        let mut summary = IngestSummary::default();
        let mut cursor = self.options.start;
        let mut state = LoopState::Running;

        info!(
            "Starting ingestion from {} ({}, {:?} stop condition)",
            self.provider.name(),
            cursor,
            self.options.stop_condition
        );

        while state == LoopState::Running {
            if cancel.is_cancelled() {
                state = LoopState::Stopped(StopReason::Cancelled);
                break;
            }

            let batch = self.provider.fetch_numbers(&cursor).await?;
            summary.iterations += 1;
            summary.records_seen += batch.records.len() as u64;
            summary.skipped += batch.skipped.len() as u64;

            let counts = self.persist_batch(&batch).await?;
            summary.inserted += counts.inserted;
            summary.updated += counts.updated;

            debug!(
                "{}: {} rows, {} inserted, {} updated, {} skipped",
                cursor,
                batch.rows_seen(),
                counts.inserted,
                counts.updated,
                batch.skipped.len()
            );

            state = self.next_state(&batch, counts, summary.iterations);
            if state != LoopState::Running {
                break;
            }

            cursor = cursor.next();
            if !self.pause(cancel).await {
                state = LoopState::Stopped(StopReason::Cancelled);
            }
        }

        if let LoopState::Stopped(reason) = state {
            summary.stop_reason = Some(reason);
            info!(
                "Ingestion stopped ({}) after {} polls: {} inserted, {} updated, {} skipped",
                reason, summary.iterations, summary.inserted, summary.updated, summary.skipped
            );
        }
        Ok(summary)
    }

    /// Upsert in page order. The first failure aborts the rest of the batch.
    async fn persist_batch(&self, batch: &ListingBatch) -> Result<BatchCounts, PersistenceError> {
        let mut counts = BatchCounts::default();
        for record in &batch.records {
            let outcome = self.repository.upsert(record).await.map_err(|e| {
                warn!("Failed to persist {}: {}", record, e);
                e
            })?;
            if outcome.inserted {
                counts.inserted += 1;
            } else {
                counts.updated += 1;
            }
        }
        Ok(counts)
    }

    fn next_state(&self, batch: &ListingBatch, counts: BatchCounts, iterations: u32) -> LoopState {
        if batch.is_empty() {
            return LoopState::Stopped(StopReason::EmptyBatch);
        }
        if self.options.stop_condition == StopCondition::NoNewRows && counts.inserted == 0 {
            return LoopState::Stopped(StopReason::NoNewRows);
        }
        if self.options.max_iterations.is_some_and(|max| iterations >= max) {
            return LoopState::Stopped(StopReason::IterationLimit);
        }
        LoopState::Running
    }

    /// Sleep between polls. Returns false when cancelled while waiting.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.options.poll_interval.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(self.options.poll_interval) => true,
        }
    }
}
