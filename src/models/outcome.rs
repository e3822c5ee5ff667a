use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use super::reading::{format_timestamp, AccountId, MeterReading};

/// Why a candidate row was refused
///
/// The display text is what the uploader sees, after the line prefix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("AccountId must be a valid integer.")]
    InvalidAccountId,

    #[error("AccountId {0} does not exist in the system.")]
    UnknownAccount(AccountId),

    #[error("MeterReadingDateTime must be in format: dd/MM/yyyy HH:mm.")]
    InvalidTimestamp,

    #[error("Duplicate reading for AccountId {account_id} at {}.", format_timestamp(.read_at))]
    Duplicate {
        account_id: AccountId,
        read_at: NaiveDateTime,
    },

    #[error(
        "Reading date {} is older than existing reading {} for AccountId {account_id}.",
        format_timestamp(.read_at),
        format_timestamp(.latest)
    )]
    OlderThanLatest {
        account_id: AccountId,
        read_at: NaiveDateTime,
        latest: NaiveDateTime,
    },

    #[error("MeterReadValue is required.")]
    MissingValue,

    #[error("MeterReadValue must be numeric and up to 5 digits.")]
    InvalidValue,

    /// A history lookup failed while the row was being checked
    #[error("Error validating record - {0}")]
    LookupFailed(String),
}

/// A refused row together with its 1-based file line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub line_number: usize,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(line_number: usize, reason: RejectionReason) -> Self {
        Self {
            line_number,
            reason,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line_number, self.reason)
    }
}

/// Result of running one row through the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(MeterReading),
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }

    /// Line-prefixed rejection text, if the row was refused
    pub fn error_message(&self) -> Option<String> {
        match self {
            ValidationOutcome::Accepted(_) => None,
            ValidationOutcome::Rejected(rejection) => Some(rejection.to_string()),
        }
    }
}

/// Tally for one uploaded file
///
/// `errors` holds one entry per failed row, in file order. A batch that
/// could not be parsed or saved carries one extra pipeline-level message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    #[serde(rename = "successfulReadings")]
    pub success_count: usize,
    #[serde(rename = "failedReadings")]
    pub failure_count: usize,
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Result for a batch that never reached row validation
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            success_count: 0,
            failure_count: 0,
            errors: vec![message.into()],
        }
    }

    pub(crate) fn record_rejection(&mut self, rejection: &Rejection) {
        self.failure_count += 1;
        self.errors.push(rejection.to_string());
    }
}
