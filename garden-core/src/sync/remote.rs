//! Remote document store contract.
//!
//! The remote store is the authoritative copy of every record. Documents live
//! in named collections and carry an owner-scoping field ([`OWNER_FIELD`])
//! that every query filters on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field map of a remote document.
pub type Fields = Map<String, Value>;

/// Name of the owner-scoping field stored on every document.
pub const OWNER_FIELD: &str = "userId";

/// A document as stored remotely: an id plus a free-form field map.
///
/// Cached collections use the same shape, so a cached record can be run
/// through the same remote-to-domain transform as a freshly fetched one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A window into a scoped listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// Errors reported by a remote store implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// The store could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store answered with an unexpected status.
    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The addressed document does not exist.
    #[error("Document not found")]
    NotFound,

    /// The store refused the request; repeating it will not help.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The response could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RemoteError::Rejected(_) | RemoteError::NotFound)
    }
}

/// Operations the sync layer issues against the remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists one page of `owner`'s documents in `collection`.
    async fn list(
        &self,
        collection: &str,
        owner: &str,
        page: PageRequest,
    ) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Fetches a single document, `None` if it does not exist.
    async fn get(
        &self,
        collection: &str,
        owner: &str,
        id: &str,
    ) -> Result<Option<RemoteDocument>, RemoteError>;

    /// Inserts a new document and returns its remote-assigned id.
    async fn insert(
        &self,
        collection: &str,
        owner: &str,
        fields: Fields,
    ) -> Result<String, RemoteError>;

    /// Overwrites the given fields of an existing document. A missing
    /// document is reported as [`RemoteError::NotFound`].
    async fn update(
        &self,
        collection: &str,
        owner: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError>;

    /// Removes a document permanently.
    async fn delete(&self, collection: &str, owner: &str, id: &str) -> Result<(), RemoteError>;
}
