//! In-memory object store
//!
//! Behaves like an S3 bucket service for the operations the adapter uses:
//! buckets must exist, PUT replaces, DELETE of a missing key succeeds, and
//! LIST supports prefix, delimiter, exclusive marker, page size and
//! truncation. Intended for tests and embedding.

use super::{
    ClientOptions, GetObjectOutput, ListObjectsOutput, ListObjectsRequest, ObjectHead,
    ObjectStore, ObjectSummary, PutObjectRequest, StoreError, StoreFactory, StoreResult,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Page size used when a LIST request does not set one
pub const DEFAULT_MAX_KEYS: u32 = 1000;

/// An object as held by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub acl: Option<String>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub expires: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl StoredObject {
    fn head(&self) -> ObjectHead {
        ObjectHead {
            content_length: self.body.len() as u64,
            last_modified: self.last_modified,
            content_type: self.content_type.clone(),
            etag: Some(self.etag.clone()),
            metadata: self.metadata.clone(),
        }
    }
}

/// Snapshot of how many calls each operation received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get: u64,
    pub head: u64,
    pub put: u64,
    pub delete: u64,
    pub list: u64,
}

#[derive(Debug, Default)]
struct Counters {
    get: AtomicU64,
    head: AtomicU64,
    put: AtomicU64,
    delete: AtomicU64,
    list: AtomicU64,
}

type Buckets = HashMap<String, BTreeMap<String, StoredObject>>;

/// In-memory, BTreeMap-backed object store
///
/// Clones share the same buckets.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<Buckets>>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    /// Create an empty store with no buckets
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given bucket already present
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.create_bucket(bucket);
        store
    }

    /// Create a bucket. Returns false if it already existed.
    pub fn create_bucket(&self, bucket: &str) -> bool {
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket) {
            return false;
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        true
    }

    /// Check whether a bucket exists
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.read().contains_key(bucket)
    }

    /// Copy of a stored object, including the headers it was written with
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets.read().get(bucket)?.get(key).cloned()
    }

    /// All keys in a bucket, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Per-operation call counts since creation or the last reset
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            get: self.counters.get.load(Ordering::Relaxed),
            head: self.counters.head.load(Ordering::Relaxed),
            put: self.counters.put.load(Ordering::Relaxed),
            delete: self.counters.delete.load(Ordering::Relaxed),
            list: self.counters.list.load(Ordering::Relaxed),
        }
    }

    pub fn reset_calls(&self) {
        for counter in [
            &self.counters.get,
            &self.counters.head,
            &self.counters.put,
            &self.counters.delete,
            &self.counters.list,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn lookup(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::no_such_key(bucket, key))
    }
}

/// Compute a hex SHA-256 ETag for a body
fn compute_etag(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Where a LIST should start: at the prefix, or strictly after the marker
fn lower_bound(prefix: &str, marker: Option<&str>) -> Bound<String> {
    match marker {
        Some(m) if m >= prefix => Bound::Excluded(m.to_string()),
        _ if prefix.is_empty() => Bound::Unbounded,
        _ => Bound::Included(prefix.to_string()),
    }
}

impl ObjectStore for MemoryStore {
    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<GetObjectOutput> {
        self.counters.get.fetch_add(1, Ordering::Relaxed);
        let object = self.lookup(bucket, key)?;
        let head = object.head();
        Ok(GetObjectOutput {
            body: object.body,
            head,
        })
    }

    fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead> {
        self.counters.head.fetch_add(1, Ordering::Relaxed);
        Ok(self.lookup(bucket, key)?.head())
    }

    fn put_object(&self, request: PutObjectRequest) -> StoreResult<String> {
        self.counters.put.fetch_add(1, Ordering::Relaxed);
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(&request.bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(request.bucket.clone()))?;

        let etag = compute_etag(&request.body);
        debug!(
            "memory put {}/{} ({} bytes)",
            request.bucket,
            request.key,
            request.body.len()
        );
        objects.insert(
            request.key,
            StoredObject {
                body: request.body,
                last_modified: Utc::now(),
                etag: etag.clone(),
                acl: request.acl,
                content_type: request.content_type,
                cache_control: request.cache_control,
                content_disposition: request.content_disposition,
                content_encoding: request.content_encoding,
                content_language: request.content_language,
                expires: request.expires,
                metadata: request.metadata,
            },
        );
        Ok(etag)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.counters.delete.fetch_add(1, Ordering::Relaxed);
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        objects.remove(key);
        Ok(())
    }

    fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ListObjectsOutput> {
        self.counters.list.fetch_add(1, Ordering::Relaxed);
        let buckets = self.buckets.read();
        let objects = buckets
            .get(&request.bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(request.bucket.clone()))?;

        let prefix = request.prefix.as_deref().unwrap_or("");
        let marker = request.marker.as_deref();
        let delimiter = request.delimiter.as_deref().filter(|d| !d.is_empty());
        let max_keys = request.max_keys.unwrap_or(DEFAULT_MAX_KEYS).max(1) as usize;

        let mut output = ListObjectsOutput::default();
        let mut returned = 0usize;
        let mut last_entry: Option<String> = None;

        let range = (lower_bound(prefix, marker), Bound::Unbounded);
        for (key, object) in objects.range::<String, _>(range) {
            // Keys sharing the prefix are contiguous in sort order
            if !key.starts_with(prefix) {
                break;
            }

            let rest = &key[prefix.len()..];
            let common = delimiter
                .and_then(|d| rest.find(d).map(|idx| format!("{}{}", prefix, &rest[..idx + d.len()])));

            if let Some(common) = &common {
                let seen = output.common_prefixes.last() == Some(common);
                if seen || marker == Some(common.as_str()) {
                    continue;
                }
            }

            if returned == max_keys {
                output.is_truncated = true;
                break;
            }
            returned += 1;

            match common {
                Some(common) => {
                    last_entry = Some(common.clone());
                    output.common_prefixes.push(common);
                }
                None => {
                    last_entry = Some(key.clone());
                    output.contents.push(ObjectSummary {
                        key: key.clone(),
                        size: object.body.len() as u64,
                        last_modified: object.last_modified,
                    });
                }
            }
        }

        // S3 only reports NextMarker for delimited listings
        if output.is_truncated && delimiter.is_some() {
            output.next_marker = last_entry;
        }

        Ok(output)
    }
}

/// Factory handing out clients that share one [`MemoryStore`]
///
/// A `buckets` client option (array of names) creates those buckets on
/// connect.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreFactory {
    store: MemoryStore,
}

impl MemoryStoreFactory {
    pub fn new(store: MemoryStore) -> Self {
        MemoryStoreFactory { store }
    }

    /// The shared store behind every client this factory builds
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl StoreFactory for MemoryStoreFactory {
    fn name(&self) -> &str {
        "memory"
    }

    fn connect(&self, options: &ClientOptions) -> StoreResult<Arc<dyn ObjectStore>> {
        if let Some(buckets) = options.get("buckets").and_then(|v| v.as_array()) {
            for bucket in buckets.iter().filter_map(|b| b.as_str()) {
                self.store.create_bucket(bucket);
            }
        }
        Ok(Arc::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(store: &MemoryStore, key: &str, body: &[u8]) {
        store
            .put_object(PutObjectRequest::new("bucket", key, body.to_vec()))
            .unwrap();
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::with_bucket("bucket");
        for key in ["a/x", "a/y", "a/z/1", "a/z/2", "b", "c/d"] {
            put(&store, key, b"data");
        }
        store
    }

    #[test]
    fn test_put_get_head_delete() {
        let store = MemoryStore::with_bucket("bucket");
        let etag = store
            .put_object(PutObjectRequest::new("bucket", "file.txt", b"hello".to_vec()))
            .unwrap();
        assert_eq!(etag.len(), 64);

        let got = store.get_object("bucket", "file.txt").unwrap();
        assert_eq!(got.body, b"hello");
        assert_eq!(got.head.content_length, 5);

        let head = store.head_object("bucket", "file.txt").unwrap();
        assert_eq!(head.etag.as_deref(), Some(etag.as_str()));

        store.delete_object("bucket", "file.txt").unwrap();
        assert!(store.get_object("bucket", "file.txt").unwrap_err().is_not_found());

        // Deleting again is fine
        store.delete_object("bucket", "file.txt").unwrap();
    }

    #[test]
    fn test_missing_bucket() {
        let store = MemoryStore::new();
        let err = store
            .put_object(PutObjectRequest::new("nope", "k", Vec::new()))
            .unwrap_err();
        assert!(matches!(err, StoreError::NoSuchBucket(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_object_exists_default_method() {
        let store = seeded();
        assert!(store.object_exists("bucket", "b").unwrap());
        assert!(!store.object_exists("bucket", "nothing").unwrap());
    }

    #[test]
    fn test_list_with_delimiter() {
        let store = seeded();
        let page = store
            .list_objects(&ListObjectsRequest::new("bucket").prefix("a/").delimiter("/"))
            .unwrap();

        let keys: Vec<_> = page.contents.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/x", "a/y"]);
        assert_eq!(page.common_prefixes, vec!["a/z/"]);
        assert!(!page.is_truncated);
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_list_root_without_prefix() {
        let store = seeded();
        let page = store
            .list_objects(&ListObjectsRequest::new("bucket").delimiter("/"))
            .unwrap();
        let keys: Vec<_> = page.contents.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["b"]);
        assert_eq!(page.common_prefixes, vec!["a/", "c/"]);
    }

    #[test]
    fn test_list_pagination_with_marker() {
        let store = seeded();
        let request = ListObjectsRequest::new("bucket")
            .prefix("a/")
            .delimiter("/")
            .max_keys(2);

        let first = store.list_objects(&request).unwrap();
        assert!(first.is_truncated);
        assert_eq!(first.next_marker.as_deref(), Some("a/y"));
        assert_eq!(first.contents.len(), 2);

        let second = store
            .list_objects(&request.clone().marker("a/y"))
            .unwrap();
        assert!(!second.is_truncated);
        assert!(second.contents.is_empty());
        assert_eq!(second.common_prefixes, vec!["a/z/"]);
    }

    #[test]
    fn test_marker_on_common_prefix_skips_its_keys() {
        let store = seeded();
        let page = store
            .list_objects(&ListObjectsRequest::new("bucket").delimiter("/").marker("a/"))
            .unwrap();
        let keys: Vec<_> = page.contents.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["b"]);
        assert_eq!(page.common_prefixes, vec!["c/"]);
    }

    #[test]
    fn test_list_without_delimiter_has_no_next_marker() {
        let store = seeded();
        let page = store
            .list_objects(&ListObjectsRequest::new("bucket").max_keys(1))
            .unwrap();
        assert!(page.is_truncated);
        assert!(page.next_marker.is_none());
        assert_eq!(page.contents[0].key, "a/x");
    }

    #[test]
    fn test_call_counts() {
        let store = seeded();
        store.reset_calls();
        let _ = store.head_object("bucket", "b");
        let _ = store.get_object("bucket", "missing");
        let _ = store.list_objects(&ListObjectsRequest::new("bucket"));

        let calls = store.calls();
        assert_eq!(calls.head, 1);
        assert_eq!(calls.get, 1);
        assert_eq!(calls.list, 1);
        assert_eq!(calls.put, 0);
    }

    #[test]
    fn test_factory_shares_store_and_creates_buckets() {
        let factory = MemoryStoreFactory::default();
        let mut options = ClientOptions::new();
        options.insert("buckets".to_string(), serde_json::json!(["one", "two"]));

        let client = factory.connect(&options).unwrap();
        client
            .put_object(PutObjectRequest::new("one", "k", b"v".to_vec()))
            .unwrap();

        assert_eq!(factory.name(), "memory");
        assert!(factory.store().has_bucket("two"));
        assert_eq!(factory.store().keys("one"), vec!["k"]);
    }
}
