use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Account identifier as stored
pub type AccountId = i32;

/// Display format for reading timestamps in user-facing messages
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Width every stored reading value is zero-padded to
pub const READ_VALUE_WIDTH: usize = 5;

/// Render a reading timestamp as `dd/MM/yyyy HH:mm`
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// One unvalidated data row from an uploaded file
///
/// Fields hold the trimmed cell text; a missing cell is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRow {
    pub account_id: String,
    pub reading_date_time: String,
    pub read_value: String,
}

impl CandidateRow {
    pub fn new(
        account_id: impl Into<String>,
        reading_date_time: impl Into<String>,
        read_value: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            reading_date_time: reading_date_time.into(),
            read_value: read_value.into(),
        }
    }
}

/// A validated, normalized meter reading
///
/// Only the validator builds these from user input, so the value is always
/// exactly five ASCII digits. Stores receive them by value and own them
/// from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReading {
    account_id: AccountId,
    read_at: NaiveDateTime,
    value: String,
}

impl MeterReading {
    pub(crate) fn new(account_id: AccountId, read_at: NaiveDateTime, value: String) -> Self {
        Self {
            account_id,
            read_at,
            value,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn read_at(&self) -> NaiveDateTime {
        self.read_at
    }

    /// Zero-padded five digit value
    pub fn value(&self) -> &str {
        &self.value
    }
}
