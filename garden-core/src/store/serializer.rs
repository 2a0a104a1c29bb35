//! FIFO access to a [`LocalStore`].
//!
//! All reads and writes of cached collections are submitted to a
//! [`Serializer`]. A single worker task drains the queue and runs each
//! operation to completion before starting the next, so a read-modify-write of
//! one key never interleaves with another operation on the same store.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::{LocalStore, StoreError};
use crate::sync::SyncError;

type Job = Box<dyn FnOnce(Arc<dyn LocalStore>) -> BoxFuture<'static, ()> + Send>;

/// Queue that runs store operations one at a time, in submission order.
///
/// Cloning shares the queue. Must be created inside a tokio runtime; the
/// worker stops once every clone has been dropped.
#[derive(Clone)]
pub struct Serializer {
    sender: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl Serializer {
    /// Starts a worker draining operations against `store`.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(drain(store, receiver));
        Self { sender }
    }

    /// Queues `operation` and waits for its result.
    ///
    /// An operation that fails (or panics) settles only its own caller; the
    /// queue keeps draining.
    pub async fn submit<T, F, Fut>(&self, operation: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn LocalStore>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::new(move |store| {
            async move {
                let result = AssertUnwindSafe(async move { operation(store).await })
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(StoreError::Backend("storage operation panicked".to_string()).into())
                    });
                // The caller may have stopped waiting.
                let _ = tx.send(result);
            }
            .boxed()
        });

        self.sender.send(job).map_err(|_| SyncError::QueueClosed)?;
        rx.await.map_err(|_| SyncError::QueueClosed)?
    }

    /// Reads the collection stored under `key`.
    pub async fn read_collection<T>(&self, key: impl Into<String>) -> Result<Vec<T>, SyncError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let key = key.into();
        self.submit(move |store| async move { load_collection(store.as_ref(), &key).await })
            .await
    }

    /// Replaces the collection stored under `key`.
    pub async fn write_collection<T>(
        &self,
        key: impl Into<String>,
        records: Vec<T>,
    ) -> Result<(), SyncError>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let key = key.into();
        self.submit(move |store| async move {
            save_collection(store.as_ref(), &key, &records).await
        })
        .await
    }

    /// Reads, modifies and writes back one collection as a single queued
    /// operation.
    pub async fn update_collection<T, R, F>(
        &self,
        key: impl Into<String>,
        modify: F,
    ) -> Result<R, SyncError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        R: Send + 'static,
        F: FnOnce(&mut Vec<T>) -> R + Send + 'static,
    {
        let key = key.into();
        self.submit(move |store| async move {
            let mut records = load_collection::<T>(store.as_ref(), &key).await?;
            let result = modify(&mut records);
            save_collection(store.as_ref(), &key, &records).await?;
            Ok(result)
        })
        .await
    }

    /// Removes the collection stored under `key`.
    pub async fn remove(&self, key: impl Into<String>) -> Result<(), SyncError> {
        let key = key.into();
        self.submit(move |store| async move { Ok(store.remove(&key).await?) })
            .await
    }

    /// Removes every cached collection.
    pub async fn clear(&self) -> Result<(), SyncError> {
        self.submit(|store| async move { Ok(store.clear().await?) })
            .await
    }
}

async fn drain(store: Arc<dyn LocalStore>, mut receiver: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = receiver.recv().await {
        job(Arc::clone(&store)).await;
    }
    tracing::debug!("Storage queue closed");
}

/// Loads a record array from `store`, healing a corrupt value.
///
/// A value that is not a JSON array is removed and read as empty. Elements
/// that do not decode as `T` are skipped.
pub(crate) async fn load_collection<T>(
    store: &dyn LocalStore,
    key: &str,
) -> Result<Vec<T>, SyncError>
where
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(Vec::new());
    };

    let items = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        _ => {
            let err = SyncError::StorageCorruption {
                key: key.to_string(),
            };
            tracing::warn!(key, error = %err, "Clearing corrupt cached collection");
            store.remove(key).await?;
            return Ok(Vec::new());
        }
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(key, error = %e, "Skipping unreadable cached record");
                None
            }
        })
        .collect();

    tracing::debug!(
        key,
        count = records.len(),
        skipped = total - records.len(),
        "Read cached collection"
    );
    Ok(records)
}

pub(crate) async fn save_collection<T>(
    store: &dyn LocalStore,
    key: &str,
    records: &[T],
) -> Result<(), SyncError>
where
    T: Serialize,
{
    let raw = serde_json::to_string(records)?;
    store.set(key, raw).await?;
    tracing::debug!(key, count = records.len(), "Wrote cached collection");
    Ok(())
}
