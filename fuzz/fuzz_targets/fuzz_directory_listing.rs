#![no_main]
use bucketfs::store::PutObjectRequest;
use bucketfs::{DirectoryIterator, Locator, MemoryStore, ObjectStore};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    keys: Vec<String>,
    prefix: String,
    page_size: u8,
}

// Paged listing must match a single-page listing, without duplicates
fuzz_target!(|input: Input| {
    let store = MemoryStore::with_bucket("fuzz");
    for key in input.keys.iter().take(64) {
        let _ = store.put_object(PutObjectRequest::new("fuzz", key.as_str(), Vec::new()));
    }
    let store: Arc<dyn ObjectStore> = Arc::new(store);
    let locator = Locator::new("fuzz", input.prefix.trim_start_matches('/'));

    let collect = |page_size: u32| -> Vec<String> {
        DirectoryIterator::open(store.clone(), &locator, "/", page_size)
            .map(|entry| entry.map(|e| e.key().to_string()))
            .collect::<Result<_, _>>()
            .unwrap_or_default()
    };

    let paged = collect(u32::from(input.page_size).max(1));
    let whole = collect(1000);

    let unique: BTreeSet<&String> = paged.iter().collect();
    assert_eq!(unique.len(), paged.len());
    assert_eq!(unique, whole.iter().collect::<BTreeSet<_>>());
});
