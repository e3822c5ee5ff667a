use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::error::StoreResult;
use crate::models::{Account, AccountId, MeterReading};

/// Read-only history queries the validator depends on
///
/// Every answer reflects store state at the moment of the call.
pub trait ReadingLookup {
    /// Whether `account_id` is a known account
    fn account_exists(&self, account_id: AccountId) -> StoreResult<bool>;

    /// Whether a reading is already stored for this account at exactly `read_at`
    fn reading_exists(&self, account_id: AccountId, read_at: NaiveDateTime) -> StoreResult<bool>;

    /// Most recent stored reading timestamp for the account, if it has any
    fn latest_timestamp(&self, account_id: AccountId) -> StoreResult<Option<NaiveDateTime>>;
}

/// Persistence backend for accepted readings
///
/// Readings are append-only; the only removal is a full wipe.
pub trait ReadingStore: ReadingLookup + Send {
    /// Append a batch of readings in one call
    ///
    /// Either every reading is stored or the call fails; callers treat an
    /// error as "nothing from this batch was saved".
    fn append_readings(&mut self, readings: &[MeterReading]) -> StoreResult<()>;

    /// Remove every stored reading, returning how many were removed
    fn delete_all_readings(&mut self) -> StoreResult<usize>;
}

/// Per-account timestamp index used for duplicate and ordering checks
#[derive(Debug, Clone, Default)]
pub(crate) struct AccountHistory {
    timestamps: HashSet<NaiveDateTime>,
    latest: Option<NaiveDateTime>,
}

impl AccountHistory {
    pub(crate) fn record(&mut self, read_at: NaiveDateTime) {
        self.timestamps.insert(read_at);
        self.latest = self.latest.max(Some(read_at));
    }

    pub(crate) fn contains(&self, read_at: NaiveDateTime) -> bool {
        self.timestamps.contains(&read_at)
    }

    pub(crate) fn latest(&self) -> Option<NaiveDateTime> {
        self.latest
    }
}

/// In-memory store keeping accounts, readings in append order, and a
/// per-account timestamp index
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: BTreeMap<AccountId, Account>,
    readings: Vec<MeterReading>,
    history: HashMap<AccountId, AccountHistory>,
}

impl MemoryStore {
    /// Create an empty store with no accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let mut store = Self::new();
        store.add_accounts(accounts);
        store
    }

    /// Seed accounts, skipping ids that are already known
    ///
    /// Returns the number of accounts added.
    pub fn add_accounts(&mut self, accounts: impl IntoIterator<Item = Account>) -> usize {
        let mut added = 0;
        for account in accounts {
            if let std::collections::btree_map::Entry::Vacant(entry) =
                self.accounts.entry(account.account_id)
            {
                entry.insert(account);
                added += 1;
            }
        }
        added
    }

    /// All accounts, ordered by id
    pub fn accounts(&self) -> Vec<&Account> {
        self.accounts.values().collect()
    }

    pub fn account(&self, account_id: AccountId) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    /// Every stored reading in append order
    pub fn readings(&self) -> &[MeterReading] {
        &self.readings
    }

    /// Stored readings for one account, in append order
    pub fn readings_for(&self, account_id: AccountId) -> Vec<&MeterReading> {
        self.readings
            .iter()
            .filter(|reading| reading.account_id() == account_id)
            .collect()
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    /// Index a reading without any checks; used by journal replay
    pub(crate) fn push_reading(&mut self, reading: MeterReading) {
        self.history
            .entry(reading.account_id())
            .or_default()
            .record(reading.read_at());
        self.readings.push(reading);
    }
}

impl ReadingLookup for MemoryStore {
    fn account_exists(&self, account_id: AccountId) -> StoreResult<bool> {
        Ok(self.accounts.contains_key(&account_id))
    }

    fn reading_exists(&self, account_id: AccountId, read_at: NaiveDateTime) -> StoreResult<bool> {
        Ok(self
            .history
            .get(&account_id)
            .is_some_and(|history| history.contains(read_at)))
    }

    fn latest_timestamp(&self, account_id: AccountId) -> StoreResult<Option<NaiveDateTime>> {
        Ok(self
            .history
            .get(&account_id)
            .and_then(AccountHistory::latest))
    }
}

impl ReadingStore for MemoryStore {
    fn append_readings(&mut self, readings: &[MeterReading]) -> StoreResult<()> {
        self.readings.reserve(readings.len());
        for reading in readings {
            self.push_reading(reading.clone());
        }
        Ok(())
    }

    fn delete_all_readings(&mut self) -> StoreResult<usize> {
        let removed = self.readings.len();
        self.readings.clear();
        self.history.clear();
        Ok(removed)
    }
}
