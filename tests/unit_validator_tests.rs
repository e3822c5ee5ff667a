mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{build_csv, ingest_str, seeded_engine, seeded_store, FailingStore};
use meter_readings::models::{CandidateRow, RejectionReason, ValidationOutcome};
use meter_readings::validator::Validator;
use meter_readings::{IngestionEngine, MemoryStore};

fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 4, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn row(account: &str, timestamp: &str, value: &str) -> CandidateRow {
    CandidateRow::new(account, timestamp, value)
}

/// Store that already holds one reading for 2344 at 22/04/2019 12:00
fn store_with_history() -> MemoryStore {
    let mut engine = seeded_engine();
    let result = ingest_str(
        &mut engine,
        &build_csv(&[("2344", "22/04/2019 12:00", "01000")]),
    );
    assert_eq!(result.success_count, 1);
    engine.into_store()
}

fn rejection(outcome: ValidationOutcome) -> String {
    outcome
        .error_message()
        .unwrap_or_else(|| panic!("expected rejection, got {:?}", outcome))
}

#[test]
fn test_valid_row_is_accepted() {
    let store = seeded_store();
    let outcome = Validator::new(&store).validate(&row("2344", "22/04/2019 09:24", "01002"), 2);

    match outcome {
        ValidationOutcome::Accepted(reading) => {
            assert_eq!(reading.account_id(), 2344);
            assert_eq!(reading.read_at(), ts(22, 9, 24));
            assert_eq!(reading.value(), "01002");
        }
        other => panic!("expected acceptance, got {:?}", other),
    }
}

#[test]
fn test_non_integer_account_id() {
    let store = seeded_store();
    let validator = Validator::new(&store);

    for account in ["abc", "", "23.44", "2344x"] {
        let message = rejection(validator.validate(&row(account, "22/04/2019 09:24", "12345"), 4));
        assert_eq!(message, "Line 4: AccountId must be a valid integer.");
    }
}

#[test]
fn test_unknown_account() {
    let store = seeded_store();
    let message =
        rejection(Validator::new(&store).validate(&row("9999", "22/04/2019 09:24", "01002"), 2));

    assert!(message.contains("does not exist in the system"));
    assert_eq!(message, "Line 2: AccountId 9999 does not exist in the system.");
}

#[test]
fn test_malformed_timestamp() {
    let store = seeded_store();
    let message =
        rejection(Validator::new(&store).validate(&row("2344", "invalid-date", "01002"), 7));

    assert!(message.contains("must be in format"));
    assert_eq!(
        message,
        "Line 7: MeterReadingDateTime must be in format: dd/MM/yyyy HH:mm."
    );
}

#[test]
fn test_short_timestamp_fields_accepted() {
    let store = seeded_store();
    let validator = Validator::new(&store);

    for timestamp in [
        "22/04/2019 9:24",
        "2/4/2019 09:24",
        "2/4/2019 9:24",
        "22/04/2019 09:24",
    ] {
        let outcome = validator.validate(&row("2344", timestamp, "01002"), 2);
        assert!(outcome.is_accepted(), "{} should be accepted", timestamp);
    }
}

#[test]
fn test_duplicate_of_stored_reading() {
    let store = store_with_history();
    let message =
        rejection(Validator::new(&store).validate(&row("2344", "22/04/2019 12:00", "01003"), 2));

    assert!(message.contains("Duplicate reading"));
    assert_eq!(
        message,
        "Line 2: Duplicate reading for AccountId 2344 at 22/04/2019 12:00."
    );
}

#[test]
fn test_duplicate_is_checked_at_minute_precision() {
    let store = store_with_history();
    // same instant written differently
    let message =
        rejection(Validator::new(&store).validate(&row("2344", "22/4/2019 12:00", "00001"), 3));
    assert!(message.contains("Duplicate reading"));
}

#[test]
fn test_older_than_latest_reading() {
    let store = store_with_history();
    let validator = Validator::new(&store);

    let message = rejection(validator.validate(&row("2344", "20/04/2019 09:24", "01001"), 2));
    assert!(message.contains("is older than existing reading"));
    assert_eq!(
        message,
        "Line 2: Reading date 20/04/2019 09:24 is older than existing reading 22/04/2019 12:00 for AccountId 2344."
    );

    assert!(validator
        .validate(&row("2344", "23/04/2019 09:24", "01001"), 3)
        .is_accepted());
}

#[test]
fn test_history_is_per_account() {
    let store = store_with_history();
    let outcome = Validator::new(&store).validate(&row("2233", "20/04/2019 09:24", "1"), 2);
    assert!(outcome.is_accepted());
}

#[test]
fn test_missing_value() {
    let store = seeded_store();
    let validator = Validator::new(&store);

    for value in ["", "   "] {
        let message = rejection(validator.validate(&row("2344", "22/04/2019 09:24", value), 2));
        assert_eq!(message, "Line 2: MeterReadValue is required.");
    }
}

#[test]
fn test_invalid_values() {
    let store = seeded_store();
    let validator = Validator::new(&store);

    for value in ["-123", "-1", "123456", "1234567", "abc", "12.34", "12,34", "12a34", "invalid"] {
        let message = rejection(validator.validate(&row("2344", "22/04/2019 09:24", value), 2));
        assert!(
            message.contains("must be numeric and up to 5 digits"),
            "{} gave {}",
            value,
            message
        );
    }
}

#[test]
fn test_value_normalization() {
    let store = seeded_store();
    let validator = Validator::new(&store);

    for (input, expected) in [
        ("0", "00000"),
        ("7", "00007"),
        ("123", "00123"),
        ("  42  ", "00042"),
        ("12345", "12345"),
    ] {
        match validator.validate(&row("2344", "22/04/2019 09:24", input), 2) {
            ValidationOutcome::Accepted(reading) => assert_eq!(reading.value(), expected),
            other => panic!("{:?} rejected: {:?}", input, other),
        }
    }
}

#[test]
fn test_first_failing_rule_wins() {
    let store = store_with_history();
    let validator = Validator::new(&store);

    // bad account id and bad value: account rule reported
    let message = rejection(validator.validate(&row("x", "bad", "-1"), 2));
    assert_eq!(message, "Line 2: AccountId must be a valid integer.");

    // unknown account beats bad timestamp
    let message = rejection(validator.validate(&row("1", "bad", "-1"), 2));
    assert!(message.contains("does not exist"));

    // bad timestamp beats bad value
    let message = rejection(validator.validate(&row("2344", "bad", "-1"), 2));
    assert!(message.contains("must be in format"));

    // duplicate beats bad value
    let message = rejection(validator.validate(&row("2344", "22/04/2019 12:00", ""), 2));
    assert!(message.contains("Duplicate reading"));

    // older beats bad value
    let message = rejection(validator.validate(&row("2344", "21/04/2019 12:00", "abc"), 2));
    assert!(message.contains("is older than"));
}

#[test]
fn test_lookup_failure_becomes_row_error() {
    let mut store = FailingStore::new(seeded_store());
    store.fail_latest_for = Some(2233);

    let outcome = Validator::new(&store).validate(&row("2233", "22/04/2019 09:24", "1"), 5);
    match &outcome {
        ValidationOutcome::Rejected(rejection) => {
            assert!(matches!(rejection.reason, RejectionReason::LookupFailed(_)));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(
        rejection(outcome),
        "Line 5: Error validating record - storage unavailable: history query timed out"
    );

    let engine = IngestionEngine::new(store);
    assert!(Validator::new(engine.store())
        .validate(&row("2344", "22/04/2019 09:24", "1"), 6)
        .is_accepted());
}
