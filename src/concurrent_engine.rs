use std::panic;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::{self, JoinError};

use crate::engine::IngestionEngine;
use crate::error::{StoreError, StoreResult};
use crate::models::BatchResult;
use crate::persistence::ReadingStore;

/// Cloneable async handle to one ingestion engine
///
/// Uploads may arrive concurrently, but rows within a file must be checked
/// in order against everything accepted before them. The handle therefore
/// serialises whole batches behind one async mutex: each `ingest` holds the
/// lock from parse to bulk append, so no two batches interleave their
/// duplicate and ordering checks.
///
/// The lock is taken asynchronously, in arrival order; the batch itself
/// runs on the blocking pool since parsing, validation and a journal's
/// `sync_all` are all synchronous.
///
/// # Example
///
/// ```no_run
/// use meter_readings::concurrent_engine::SharedIngestor;
/// use meter_readings::models::Account;
/// use meter_readings::persistence::MemoryStore;
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryStore::with_accounts([Account::new(2344, "Tommy", "Test")]);
///     let ingestor = SharedIngestor::new(store);
///
///     let handle = ingestor.clone();
///     tokio::spawn(async move {
///         let csv = b"AccountId,MeterReadingDateTime,MeterReadValue\n2344,22/04/2019 09:24,1002\n";
///         handle.ingest(csv.to_vec()).await;
///     });
/// }
/// ```
pub struct SharedIngestor<S: ReadingStore> {
    engine: Arc<Mutex<IngestionEngine<S>>>,
}

impl<S: ReadingStore> Clone for SharedIngestor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: ReadingStore + 'static> SharedIngestor<S> {
    pub fn new(store: S) -> Self {
        Self {
            engine: Arc::new(Mutex::new(IngestionEngine::new(store))),
        }
    }

    /// Ingest one uploaded file
    pub async fn ingest(&self, upload: Vec<u8>) -> BatchResult {
        let mut engine = Arc::clone(&self.engine).lock_owned().await;
        task::spawn_blocking(move || engine.ingest(upload.as_slice()))
            .await
            .unwrap_or_else(|err| {
                BatchResult::aborted(format!("Error processing CSV file: {}", join_failure(err)))
            })
    }

    /// Ingest several uploads, returning results in the order given
    ///
    /// Batches are applied in that same order since the mutex queues
    /// waiters fairly.
    pub async fn ingest_all(&self, uploads: Vec<Vec<u8>>) -> Vec<BatchResult> {
        let batches = uploads.into_iter().map(|upload| self.ingest(upload));
        futures::future::join_all(batches).await
    }

    /// Remove every stored reading
    pub async fn clear_all(&self) -> StoreResult<usize> {
        let mut engine = Arc::clone(&self.engine).lock_owned().await;
        task::spawn_blocking(move || engine.clear_all())
            .await
            .unwrap_or_else(|err| Err(StoreError::Unavailable(join_failure(err))))
    }

    /// Run a read-only query against the store
    pub async fn with_store<T>(&self, query: impl FnOnce(&S) -> T) -> T {
        let engine = self.engine.lock().await;
        query(engine.store())
    }
}

/// Re-raise a panic from the blocking pool; describe a cancelled task
fn join_failure(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => panic::resume_unwind(payload),
        Err(err) => err.to_string(),
    }
}
