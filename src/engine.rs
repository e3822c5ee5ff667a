use std::io::Read;

use tracing::{debug, error, info, warn};

use crate::error::StoreResult;
use crate::models::{BatchResult, CandidateRow, MeterReading, RejectionReason, ValidationOutcome};
use crate::overlay::BatchOverlay;
use crate::parser::parse_readings;
use crate::persistence::ReadingStore;
use crate::validator::Validator;

/// Line number of the first data row; the header is line 1
const FIRST_DATA_LINE: usize = 2;

/// Meter reading ingestion engine
///
/// Drives one uploaded file at a time: parse, validate each row in file
/// order, then save every accepted reading with a single bulk append.
pub struct IngestionEngine<S: ReadingStore> {
    store: S,
}

impl<S: ReadingStore> IngestionEngine<S> {
    /// Create an engine over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ingest one uploaded file
    ///
    /// Bad rows never stop the batch; each one adds a line-prefixed message
    /// to `errors`. Rows are checked against stored history and against
    /// readings accepted earlier in the same file.
    ///
    /// If the file cannot be read, no row is processed and the result holds
    /// a single error. If the bulk append fails, `success_count` is zero and
    /// one more error describing the failure is appended.
    pub fn ingest<R: Read>(&mut self, reader: R) -> BatchResult {
        let candidates = match parse_readings(reader) {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(error = %err, "failed to parse meter readings file");
                return BatchResult::aborted(format!("Error processing CSV file: {}", err));
            }
        };

        let (accepted, mut result) = self.validate_batch(&candidates);

        if !accepted.is_empty() {
            match self.store.append_readings(&accepted) {
                Ok(()) => result.success_count = accepted.len(),
                Err(err) => {
                    error!(error = %err, count = accepted.len(), "failed to save meter readings");
                    result
                        .errors
                        .push(format!("Error saving meter readings: {}", err));
                }
            }
        }

        info!(
            total = candidates.len(),
            successful = result.success_count,
            failed = result.failure_count,
            "processed meter readings"
        );

        result
    }

    /// Run every candidate through the validator against an overlay of this
    /// batch's accepted readings
    fn validate_batch(
        &self,
        candidates: &[CandidateRow],
    ) -> (Vec<MeterReading>, BatchResult) {
        let mut overlay = BatchOverlay::new(&self.store);
        let mut accepted = Vec::new();
        let mut result = BatchResult::default();

        for (index, candidate) in candidates.iter().enumerate() {
            let line_number = index + FIRST_DATA_LINE;

            let outcome = Validator::new(&overlay).validate(candidate, line_number);
            match outcome {
                ValidationOutcome::Accepted(reading) => {
                    overlay.record(&reading);
                    accepted.push(reading);
                }
                ValidationOutcome::Rejected(rejection) => {
                    if let RejectionReason::LookupFailed(cause) = &rejection.reason {
                        warn!(line = line_number, %cause, "error validating record");
                    } else {
                        debug!(line = line_number, reason = %rejection.reason, "rejected reading");
                    }
                    result.record_rejection(&rejection);
                }
            }
        }

        (accepted, result)
    }

    /// Remove every stored reading, returning how many were removed
    pub fn clear_all(&mut self) -> StoreResult<usize> {
        let removed = self.store.delete_all_readings()?;
        info!(removed, "cleared meter readings");
        Ok(removed)
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the engine and return its store
    pub fn into_store(self) -> S {
        self.store
    }
}
