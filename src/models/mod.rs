pub mod account;
pub mod outcome;
pub mod reading;

pub use account::Account;
pub use outcome::{BatchResult, Rejection, RejectionReason, ValidationOutcome};
pub use reading::{format_timestamp, AccountId, CandidateRow, MeterReading, TIMESTAMP_FORMAT};
