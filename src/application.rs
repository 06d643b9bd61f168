//! Application layer module
//!
//! This module contains the ingestion use case that drives the provider
//! and repository ports.

pub mod fetch_car_numbers;

pub use fetch_car_numbers::{
    FetchCarNumbersUseCase, IngestError, IngestOptions, IngestSummary, LoopState, StopCondition,
    StopReason,
};
