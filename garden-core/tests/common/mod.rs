#![allow(dead_code)]

use async_trait::async_trait;
use garden_core::store::MemoryStore;
use garden_core::sync::{
    ErrorSink, Fields, GardenRepositories, PageRequest, RemoteCallPolicy, RemoteDocument,
    RemoteError, RemoteStore, RepositoryPolicies, SyncContext, OWNER_FIELD,
};
use garden_core::{LocalStore, MediaResolver, Serializer, StaticSession};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const USER: &str = "gardener-1";

/// In-memory remote store with switchable faults.
#[derive(Default)]
pub struct MemoryRemote {
    collections: Mutex<HashMap<String, Vec<RemoteDocument>>>,
    next_id: AtomicUsize,
    offline: AtomicBool,
    hang: AtomicBool,
    ignore_offset: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every call never settles.
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// `list` always answers from the first record, whatever the offset.
    pub fn set_ignore_offset(&self, ignore: bool) {
        self.ignore_offset.store(ignore, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stores a document as-is for `owner`.
    pub fn seed(&self, collection: &str, owner: &str, value: Value) {
        let mut doc: RemoteDocument = serde_json::from_value(value).unwrap();
        doc.fields
            .insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<RemoteDocument> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned())
    }

    /// Drops a document behind the repository's back.
    pub fn forget(&self, collection: &str, id: &str) {
        if let Some(docs) = self.collections.lock().unwrap().get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
    }

    async fn enter(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Connection("network unreachable".to_string()));
        }
        Ok(())
    }
}

fn owned_by(doc: &RemoteDocument, owner: &str) -> bool {
    doc.fields.get(OWNER_FIELD).and_then(Value::as_str) == Some(owner)
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn list(
        &self,
        collection: &str,
        owner: &str,
        page: PageRequest,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.enter().await?;
        let offset = if self.ignore_offset.load(Ordering::SeqCst) {
            0
        } else {
            page.offset
        };
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| owned_by(d, owner))
                    .skip(offset)
                    .take(page.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(
        &self,
        collection: &str,
        owner: &str,
        id: &str,
    ) -> Result<Option<RemoteDocument>, RemoteError> {
        self.enter().await?;
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|d| d.id == id && owned_by(d, owner))
                .cloned()
        }))
    }

    async fn insert(
        &self,
        collection: &str,
        owner: &str,
        mut fields: Fields,
    ) -> Result<String, RemoteError> {
        self.enter().await?;
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        fields.insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(RemoteDocument::new(id.clone(), fields));
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        owner: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError> {
        self.enter().await?;
        let mut collections = self.collections.lock().unwrap();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id && owned_by(d, owner)))
            .ok_or(RemoteError::NotFound)?;
        doc.fields.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, owner: &str, id: &str) -> Result<(), RemoteError> {
        self.enter().await?;
        if let Some(docs) = self.collections.lock().unwrap().get_mut(collection) {
            docs.retain(|d| !(d.id == id && owned_by(d, owner)));
        }
        Ok(())
    }
}

/// Error sink that remembers what it was told.
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn categories(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(category, _)| category.clone())
            .collect()
    }
}

impl ErrorSink for RecordingSink {
    fn log_error(
        &self,
        category: &str,
        message: &str,
        _error: &dyn Error,
        _context: &[(&str, &str)],
    ) {
        self.entries
            .lock()
            .unwrap()
            .push((category.to_string(), message.to_string()));
    }
}

/// Short deadlines and no retry spacing.
pub fn fast_policies() -> RepositoryPolicies {
    let policy = RemoteCallPolicy::default()
        .with_timeout_ms(200)
        .with_retry_delay_ms(0);
    RepositoryPolicies {
        read: policy,
        write: policy,
        metadata: policy.with_throw_on_timeout(false),
    }
}

pub struct Harness {
    pub remote: Arc<MemoryRemote>,
    pub store: Arc<MemoryStore>,
    pub serializer: Serializer,
    pub session: Arc<StaticSession>,
    pub sink: Arc<RecordingSink>,
    pub media: Arc<MediaResolver>,
    pub repos: GardenRepositories,
    _media_dir: TempDir,
}

impl Harness {
    /// Raw cached documents under `key`.
    pub async fn cached(&self, key: &str) -> Vec<RemoteDocument> {
        match self.store.get(key).await.unwrap() {
            Some(raw) => serde_json::from_str(&raw).unwrap(),
            None => Vec::new(),
        }
    }

    pub async fn cached_raw(&self, key: &str) -> Option<String> {
        self.store.get(key).await.unwrap()
    }
}

/// Builds repositories over a fresh remote, cache and media root, signed in as
/// [`USER`]. Must run inside a tokio runtime.
pub fn harness() -> Harness {
    let remote = Arc::new(MemoryRemote::new());
    let store = Arc::new(MemoryStore::new());
    let serializer = Serializer::new(store.clone());
    let session = Arc::new(StaticSession::signed_in(USER));
    let sink = Arc::new(RecordingSink::default());
    let media_dir = TempDir::new().unwrap();
    let media = Arc::new(MediaResolver::new(media_dir.path().to_path_buf()));

    let ctx = SyncContext {
        remote: remote.clone(),
        serializer: serializer.clone(),
        session: session.clone(),
        media: media.clone(),
        sink: sink.clone(),
    };

    Harness {
        repos: GardenRepositories::new(ctx, fast_policies()),
        remote,
        store,
        serializer,
        session,
        sink,
        media,
        _media_dir: media_dir,
    }
}
