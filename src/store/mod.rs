//! Storage collaborator interface
//!
//! Everything the adapter needs from an object storage service is expressed
//! through the [`ObjectStore`] trait: get, head, put, delete and a paginated
//! list. Concrete clients are built by a [`StoreFactory`] from opaque
//! [`ClientOptions`], so the transport (credentials, retries, endpoints) stays
//! outside this crate.

pub mod memory;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use memory::{MemoryStore, MemoryStoreFactory};

/// Opaque client construction options, forwarded verbatim to the factory
pub type ClientOptions = serde_json::Map<String, serde_json::Value>;

/// Storage operation result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a storage client
#[derive(Error, Debug)]
pub enum StoreError {
    /// Bucket does not exist
    #[error("Bucket does not exist: {0}")]
    NoSuchBucket(String),

    /// Object does not exist
    #[error("Object does not exist: {0}")]
    NoSuchKey(String),

    /// Any other transport failure, passed through unchanged
    #[error("Transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a `NoSuchKey` error for a bucket/key pair
    pub fn no_such_key(bucket: &str, key: &str) -> Self {
        StoreError::NoSuchKey(format!("{}/{}", bucket, key))
    }

    /// True if the error means the requested key is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NoSuchKey(_))
    }
}

/// Object header metadata returned by HEAD and GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    /// Body length in bytes
    pub content_length: u64,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
    /// Stored content type, if any
    pub content_type: Option<String>,
    /// Entity tag
    pub etag: Option<String>,
    /// User metadata (x-amz-meta-* headers)
    pub metadata: HashMap<String, String>,
}

/// GET response: body plus headers
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    pub body: Vec<u8>,
    pub head: ObjectHead,
}

/// PUT request
///
/// Optional fields are only sent when set.
#[derive(Debug, Clone, Default)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub acl: Option<String>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub expires: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl PutObjectRequest {
    /// Create a request with no optional headers
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, body: Vec<u8>) -> Self {
        PutObjectRequest {
            bucket: bucket.into(),
            key: key.into(),
            body,
            ..Default::default()
        }
    }
}

/// LIST request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    /// Only keys starting with this prefix
    pub prefix: Option<String>,
    /// Roll keys up into common prefixes at this delimiter
    pub delimiter: Option<String>,
    /// Start listing strictly after this key
    pub marker: Option<String>,
    /// Page size (objects plus common prefixes)
    pub max_keys: Option<u32>,
}

impl ListObjectsRequest {
    pub fn new(bucket: impl Into<String>) -> Self {
        ListObjectsRequest {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

/// One object in a LIST response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// LIST response page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsOutput {
    pub contents: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
    /// More results are available after this page
    pub is_truncated: bool,
    /// Marker for the next page (only guaranteed when a delimiter was sent)
    pub next_marker: Option<String>,
}

impl ListObjectsOutput {
    /// True if the page holds neither objects nor common prefixes
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty() && self.common_prefixes.is_empty()
    }
}

/// Object storage client
///
/// Calls block until the service answers. Implementations must report a
/// missing key as [`StoreError::NoSuchKey`] so callers can tell absence apart
/// from transport failures.
pub trait ObjectStore: Send + Sync {
    /// Fetch body and headers
    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<GetObjectOutput>;

    /// Fetch headers only
    fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead>;

    /// Store an object, replacing any previous body. Returns the ETag.
    fn put_object(&self, request: PutObjectRequest) -> StoreResult<String>;

    /// Delete an object. Deleting a missing key succeeds.
    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// List one page of keys
    fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ListObjectsOutput>;

    /// Check whether a key exists
    ///
    /// Default implementation issues a HEAD and maps `NoSuchKey` to `false`.
    fn object_exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        match self.head_object(bucket, key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Builds storage clients from client options
pub trait StoreFactory: Send + Sync {
    /// Short identifier of the client implementation
    fn name(&self) -> &str;

    /// Construct a client
    fn connect(&self, options: &ClientOptions) -> StoreResult<Arc<dyn ObjectStore>>;
}
