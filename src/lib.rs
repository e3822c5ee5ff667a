//! Meter reading ingestion
//!
//! Parses uploaded CSV files of meter readings, checks each row against
//! account and reading history, and saves the accepted readings in one
//! bulk append per file.

pub mod concurrent_engine;
pub mod engine;
pub mod error;
pub mod journal;
pub mod models;
pub mod overlay;
pub mod parser;
pub mod persistence;
pub mod validator;

use std::io::Read;

pub use engine::IngestionEngine;
pub use error::{ParseError, StoreError};
pub use models::{Account, BatchResult, CandidateRow, MeterReading, ValidationOutcome};
pub use persistence::{MemoryStore, ReadingLookup, ReadingStore};

/// Ingest one readings file into an in-memory store seeded with `accounts`
///
/// Returns the batch result together with the store holding the accepted
/// readings.
pub fn ingest_with_accounts<R: Read>(
    reader: R,
    accounts: impl IntoIterator<Item = Account>,
) -> (BatchResult, MemoryStore) {
    let mut engine = IngestionEngine::new(MemoryStore::with_accounts(accounts));
    let result = engine.ingest(reader);
    (result, engine.into_store())
}
