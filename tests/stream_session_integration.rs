//! Integration tests for open/read/write/flush through the registry

use bucketfs::store::{
    GetObjectOutput, ListObjectsOutput, ListObjectsRequest, ObjectHead, PutObjectRequest,
    StoreError, StoreResult,
};
use bucketfs::{
    AdapterConfig, AdapterRegistry, BucketFsError, ContentTypeTable, Locator, MemoryStore,
    MemoryStoreFactory, ObjectStore, OpenPolicy, StreamSession, Whence, WriteOptions,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Helper to create a registry backed by a shared store with one bucket
fn create_registry() -> (MemoryStore, AdapterRegistry) {
    let store = MemoryStore::with_bucket("bucket");
    let registry =
        AdapterRegistry::with_client_factory(Arc::new(MemoryStoreFactory::new(store.clone())));
    registry.register("s3", AdapterConfig::default()).unwrap();
    (store, registry)
}

#[test]
fn test_read_missing_object_fails() {
    let (_, registry) = create_registry();
    let err = registry.open("s3://bucket/absent.txt", "r").unwrap_err();
    assert!(matches!(err, BucketFsError::ObjectNotFound(_)));
}

#[test]
fn test_write_then_read_five_bytes() {
    let (store, registry) = create_registry();

    let mut file = registry.open("s3://bucket/five.txt", "w").unwrap();
    assert_eq!(file.write(b"12345"), 5);
    file.flush().unwrap();
    file.close().unwrap();

    let mut file = registry.open("s3://bucket/five.txt", "r").unwrap();
    assert_eq!(file.read(5), b"12345");
    assert!(file.read(5).is_empty());

    let stored = store.object("bucket", "five.txt").unwrap();
    assert_eq!(stored.content_type.as_deref(), Some("text/plain"));
}

#[test]
fn test_unknown_extension_uses_fallback_type() {
    let (store, registry) = create_registry();

    let mut file = registry.open("s3://bucket/blob.unknownxyz", "w").unwrap();
    file.write(b"x");
    file.close().unwrap();

    let stored = store.object("bucket", "blob.unknownxyz").unwrap();
    assert_eq!(stored.content_type.as_deref(), Some("binary/octet-stream"));
}

#[test]
fn test_seek_and_overwrite() {
    let (store, registry) = create_registry();

    let mut file = registry.open("s3://bucket/data.bin", "w+").unwrap();
    file.write(b"hello world");
    assert!(file.seek(0, Whence::Set));
    file.write(b"J");
    assert!(file.seek(-5, Whence::End));
    assert_eq!(file.read(5), b"world");
    assert!(!file.seek(-1, Whence::Set));
    file.close().unwrap();

    assert_eq!(store.object("bucket", "data.bin").unwrap().body, b"Jello world");
}

#[test]
fn test_clean_session_does_not_commit() {
    let (store, registry) = create_registry();
    store
        .put_object(PutObjectRequest::new("bucket", "k", b"v".to_vec()))
        .unwrap();
    store.reset_calls();

    let mut file = registry.open("s3://bucket/k", "r+").unwrap();
    file.read(10);
    file.close().unwrap();
    drop(file);

    assert_eq!(store.calls().put, 0);
    assert_eq!(store.calls().get, 1);
}

#[test]
fn test_exclusive_create_on_present_key() {
    let (_, registry) = create_registry();
    registry
        .open("s3://bucket/once", "x")
        .unwrap()
        .close()
        .unwrap();

    assert!(matches!(
        registry.open("s3://bucket/once", "x+"),
        Err(BucketFsError::ObjectExists(_))
    ));
}

#[test]
fn test_unsupported_mode_creates_nothing() {
    let (store, registry) = create_registry();
    assert!(matches!(
        registry.open("s3://bucket/c", "c+"),
        Err(BucketFsError::InvalidMode(_))
    ));
    assert_eq!(store.calls().get + store.calls().head + store.calls().put, 0);
}

/// Store whose PUTs fail until switched back on
struct FlakyStore {
    inner: MemoryStore,
    fail_puts: AtomicBool,
    attempts: Mutex<Vec<String>>,
}

impl ObjectStore for FlakyStore {
    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<GetObjectOutput> {
        self.inner.get_object(bucket, key)
    }

    fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead> {
        self.inner.head_object(bucket, key)
    }

    fn put_object(&self, request: PutObjectRequest) -> StoreResult<String> {
        self.attempts.lock().push(request.key.clone());
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Transport(anyhow::anyhow!("connection reset")));
        }
        self.inner.put_object(request)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.inner.delete_object(bucket, key)
    }

    fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ListObjectsOutput> {
        self.inner.list_objects(request)
    }
}

#[test]
fn test_failed_flush_keeps_session_dirty() {
    let flaky = Arc::new(FlakyStore {
        inner: MemoryStore::with_bucket("bucket"),
        fail_puts: AtomicBool::new(true),
        attempts: Mutex::new(Vec::new()),
    });

    let mut session = StreamSession::open(
        flaky.clone(),
        Locator::new("bucket", "retry.txt"),
        OpenPolicy::from_mode("w").unwrap(),
        WriteOptions::default(),
        Arc::new(ContentTypeTable::empty()),
    )
    .unwrap();
    session.write(b"payload");

    let err = session.close().unwrap_err();
    assert!(matches!(err, BucketFsError::Storage(StoreError::Transport(_))));
    assert!(session.is_open());
    assert!(session.is_dirty());
    assert_eq!(session.len(), 7);

    flaky.fail_puts.store(false, Ordering::SeqCst);
    session.close().unwrap();
    assert!(!session.is_open());

    assert_eq!(flaky.attempts.lock().len(), 2);
    assert_eq!(flaky.inner.object("bucket", "retry.txt").unwrap().body, b"payload");
}
