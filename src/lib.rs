//! Nomera Ingest - car registration number listing crawler
//!
//! Polls the autonomera777.net listing table, extracts `(number, price,
//! posted_at)` triples and upserts them into PostgreSQL.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
