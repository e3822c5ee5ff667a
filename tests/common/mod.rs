#![allow(dead_code)]

use chrono::NaiveDateTime;
use meter_readings::error::{StoreError, StoreResult};
use meter_readings::models::{Account, AccountId, BatchResult, MeterReading};
use meter_readings::{IngestionEngine, MemoryStore, ReadingLookup, ReadingStore};

pub const HEADER: &str = "AccountId,MeterReadingDateTime,MeterReadValue";

/// Accounts used across tests
pub fn test_accounts() -> Vec<Account> {
    vec![
        Account::new(2344, "Tommy", "Test"),
        Account::new(2233, "Barry", "Test"),
        Account::new(8766, "Sally", "Test"),
    ]
}

pub fn seeded_store() -> MemoryStore {
    MemoryStore::with_accounts(test_accounts())
}

pub fn seeded_engine() -> IngestionEngine<MemoryStore> {
    IngestionEngine::new(seeded_store())
}

/// Build a readings CSV with the standard header
pub fn build_csv(rows: &[(&str, &str, &str)]) -> String {
    let mut csv = format!("{}\n", HEADER);
    for (account, timestamp, value) in rows {
        csv.push_str(&format!("{},{},{}\n", account, timestamp, value));
    }
    csv
}

/// Ingest CSV text
pub fn ingest_str<S: ReadingStore>(engine: &mut IngestionEngine<S>, csv: &str) -> BatchResult {
    engine.ingest(csv.as_bytes())
}

/// Assert the counting invariants of a batch that was parsed and saved
pub fn assert_consistent(result: &BatchResult, data_rows: usize) {
    assert_eq!(result.failure_count, result.errors.len(), "{:?}", result);
    assert!(
        result.success_count + result.failure_count <= data_rows,
        "{:?}",
        result
    );
}

/// Store double wrapping a `MemoryStore` with switchable failures
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_append: bool,
    /// Fail `latest_timestamp` for this account
    pub fail_latest_for: Option<AccountId>,
    pub append_calls: usize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }
}

impl ReadingLookup for FailingStore {
    fn account_exists(&self, account_id: AccountId) -> StoreResult<bool> {
        self.inner.account_exists(account_id)
    }

    fn reading_exists(&self, account_id: AccountId, read_at: NaiveDateTime) -> StoreResult<bool> {
        self.inner.reading_exists(account_id, read_at)
    }

    fn latest_timestamp(&self, account_id: AccountId) -> StoreResult<Option<NaiveDateTime>> {
        if self.fail_latest_for == Some(account_id) {
            return Err(StoreError::Unavailable("history query timed out".to_string()));
        }
        self.inner.latest_timestamp(account_id)
    }
}

impl ReadingStore for FailingStore {
    fn append_readings(&mut self, readings: &[MeterReading]) -> StoreResult<()> {
        self.append_calls += 1;
        if self.fail_append {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.append_readings(readings)
    }

    fn delete_all_readings(&mut self) -> StoreResult<usize> {
        self.inner.delete_all_readings()
    }
}
