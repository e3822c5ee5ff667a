use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StoreError;
use crate::models::reading::READ_VALUE_WIDTH;
use crate::models::{
    AccountId, CandidateRow, MeterReading, Rejection, RejectionReason, ValidationOutcome,
};
use crate::persistence::ReadingLookup;

impl From<StoreError> for RejectionReason {
    fn from(err: StoreError) -> Self {
        RejectionReason::LookupFailed(err.to_string())
    }
}

/// Applies the admission rules to one candidate row at a time
///
/// Rules run in a fixed order and the first one that fails decides the
/// rejection reason:
///
/// 1. account id is an integer
/// 2. account exists
/// 3. timestamp is `d/M/yyyy H:mm` (day, month and hour take one or two digits)
/// 4. no reading already stored at that exact time for the account
/// 5. timestamp is not earlier than the account's latest reading
/// 6. value is present
/// 7. value is 1 to 5 ASCII digits
///
/// The validator only reads from `lookup`; it never writes.
pub struct Validator<'a, L: ReadingLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: ReadingLookup + ?Sized> Validator<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Validate `row`, found at `line_number` in the file (header is line 1)
    pub fn validate(&self, row: &CandidateRow, line_number: usize) -> ValidationOutcome {
        match self.check(row) {
            Ok(reading) => ValidationOutcome::Accepted(reading),
            Err(reason) => ValidationOutcome::Rejected(Rejection::new(line_number, reason)),
        }
    }

    fn check(&self, row: &CandidateRow) -> Result<MeterReading, RejectionReason> {
        let account_id =
            parse_account_id(&row.account_id).ok_or(RejectionReason::InvalidAccountId)?;

        if !self.lookup.account_exists(account_id)? {
            return Err(RejectionReason::UnknownAccount(account_id));
        }

        let read_at =
            parse_timestamp(&row.reading_date_time).ok_or(RejectionReason::InvalidTimestamp)?;

        if self.lookup.reading_exists(account_id, read_at)? {
            return Err(RejectionReason::Duplicate {
                account_id,
                read_at,
            });
        }

        if let Some(latest) = self.lookup.latest_timestamp(account_id)? {
            if read_at < latest {
                return Err(RejectionReason::OlderThanLatest {
                    account_id,
                    read_at,
                    latest,
                });
            }
        }

        let value = normalize_read_value(&row.read_value)?;

        Ok(MeterReading::new(account_id, read_at, value))
    }
}

fn parse_account_id(text: &str) -> Option<AccountId> {
    text.trim().parse().ok()
}

/// Parse `d/M/yyyy H:mm`, where day, month and hour may be one or two
/// digits, the year exactly four and minutes exactly two
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let (date, time) = text.trim().split_once(' ')?;

    let mut date_parts = date.split('/');
    let day = digits(date_parts.next()?, 1, 2)?;
    let month = digits(date_parts.next()?, 1, 2)?;
    let year = digits(date_parts.next()?, 4, 4)?;
    if date_parts.next().is_some() {
        return None;
    }

    let (hour, minute) = time.split_once(':')?;
    let hour = digits(hour, 1, 2)?;
    let minute = digits(minute, 2, 2)?;

    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?.and_hms_opt(hour, minute, 0)
}

fn digits(text: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if !(min_len..=max_len).contains(&text.len()) || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Trim, check and zero-pad a reading value to five digits
fn normalize_read_value(text: &str) -> Result<String, RejectionReason> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RejectionReason::MissingValue);
    }

    if trimmed.starts_with('-')
        || trimmed.len() > READ_VALUE_WIDTH
        || !trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(RejectionReason::InvalidValue);
    }

    Ok(format!("{:0>width$}", trimmed, width = READ_VALUE_WIDTH))
}
