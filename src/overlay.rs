use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::StoreResult;
use crate::models::{AccountId, MeterReading};
use crate::persistence::{AccountHistory, ReadingLookup};

/// Layered history view for one batch
///
/// Readings accepted earlier in the batch sit in memory on top of the
/// store, so later rows see them in duplicate and ordering checks before
/// anything is written.
pub struct BatchOverlay<'a, L: ReadingLookup + ?Sized> {
    store: &'a L,
    accepted: HashMap<AccountId, AccountHistory>,
}

impl<'a, L: ReadingLookup + ?Sized> BatchOverlay<'a, L> {
    pub fn new(store: &'a L) -> Self {
        Self {
            store,
            accepted: HashMap::new(),
        }
    }

    /// Make an accepted reading visible to subsequent lookups
    pub fn record(&mut self, reading: &MeterReading) {
        self.accepted
            .entry(reading.account_id())
            .or_default()
            .record(reading.read_at());
    }
}

impl<L: ReadingLookup + ?Sized> ReadingLookup for BatchOverlay<'_, L> {
    fn account_exists(&self, account_id: AccountId) -> StoreResult<bool> {
        self.store.account_exists(account_id)
    }

    fn reading_exists(&self, account_id: AccountId, read_at: NaiveDateTime) -> StoreResult<bool> {
        if self
            .accepted
            .get(&account_id)
            .is_some_and(|history| history.contains(read_at))
        {
            return Ok(true);
        }
        self.store.reading_exists(account_id, read_at)
    }

    fn latest_timestamp(&self, account_id: AccountId) -> StoreResult<Option<NaiveDateTime>> {
        let pending = self
            .accepted
            .get(&account_id)
            .and_then(|history| history.latest());
        let stored = self.store.latest_timestamp(account_id)?;
        Ok(pending.max(stored))
    }
}
