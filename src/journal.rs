use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::models::{Account, AccountId, MeterReading};
use crate::persistence::{MemoryStore, ReadingLookup, ReadingStore};

/// File-backed reading store
///
/// Readings are kept in an append-only journal, one JSON object per line.
/// Opening a journal replays it into an in-memory index, so lookups never
/// touch the disk. Accounts are seeded on open and live in memory only.
///
/// # Durability
///
/// A batch is encoded in full before anything is written, then written
/// with a single `write_all` followed by `sync_all`. If either fails the
/// file is truncated back to its length before the batch, so a failed
/// append leaves neither a torn line nor readings the index never saw.
/// The in-memory index is only updated after the sync succeeds.
///
/// # Example
///
/// ```no_run
/// use meter_readings::journal::JournalStore;
/// use meter_readings::models::Account;
///
/// let store = JournalStore::open(
///     "readings.jsonl",
///     vec![Account::new(2344, "Tommy", "Test")],
/// ).unwrap();
/// println!("{} readings on record", store.index().reading_count());
/// ```
#[derive(Debug)]
pub struct JournalStore {
    path: PathBuf,
    file: File,
    index: MemoryStore,
}

impl JournalStore {
    /// Open (or create) the journal at `path` and replay it
    pub fn open(
        path: impl AsRef<Path>,
        accounts: impl IntoIterator<Item = Account>,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut index = MemoryStore::with_accounts(accounts);
        let replayed = replay(&path, &mut index)?;
        info!(path = %path.display(), replayed, "opened reading journal");

        Ok(Self { path, file, index })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read access to the replayed state
    pub fn index(&self) -> &MemoryStore {
        &self.index
    }
}

fn replay(path: &Path, index: &mut MemoryStore) -> StoreResult<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut replayed = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reading: MeterReading = serde_json::from_str(&line)
            .map_err(|source| StoreError::CorruptJournal { line: i + 1, source })?;
        index.push_reading(reading);
        replayed += 1;
    }

    Ok(replayed)
}

/// File operations the append path needs
trait JournalFile {
    fn len(&self) -> io::Result<u64>;
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn sync_all(&self) -> io::Result<()>;
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl JournalFile for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Write::write_all(self, buf)
    }

    fn sync_all(&self) -> io::Result<()> {
        File::sync_all(self)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

/// Write and sync `buffer`, truncating back to the previous length on failure
fn append_or_rollback<F: JournalFile>(file: &mut F, buffer: &[u8]) -> io::Result<()> {
    let previous_len = file.len()?;

    let written = file.write_all(buffer).and_then(|()| file.sync_all());
    if let Err(err) = written {
        if let Err(rollback) = file.set_len(previous_len).and_then(|()| file.sync_all()) {
            warn!(error = %rollback, previous_len, "failed to roll back journal append");
        }
        return Err(err);
    }

    Ok(())
}

impl ReadingLookup for JournalStore {
    fn account_exists(&self, account_id: AccountId) -> StoreResult<bool> {
        self.index.account_exists(account_id)
    }

    fn reading_exists(&self, account_id: AccountId, read_at: NaiveDateTime) -> StoreResult<bool> {
        self.index.reading_exists(account_id, read_at)
    }

    fn latest_timestamp(&self, account_id: AccountId) -> StoreResult<Option<NaiveDateTime>> {
        self.index.latest_timestamp(account_id)
    }
}

impl ReadingStore for JournalStore {
    fn append_readings(&mut self, readings: &[MeterReading]) -> StoreResult<()> {
        let mut buffer = Vec::new();
        for reading in readings {
            serde_json::to_writer(&mut buffer, reading)?;
            buffer.push(b'\n');
        }

        append_or_rollback(&mut self.file, &buffer)?;
        debug!(count = readings.len(), "appended readings to journal");

        self.index.append_readings(readings)
    }

    fn delete_all_readings(&mut self) -> StoreResult<usize> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.index.delete_all_readings()
    }
}
