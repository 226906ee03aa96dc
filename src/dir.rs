//! Directory listing
//!
//! [`DirectoryIterator`] walks a prefix one listing page at a time. Pages are
//! only requested when the entries from the previous page are used up.

use crate::error::Result;
use crate::locator::Locator;
use crate::store::{ListObjectsRequest, ObjectStore};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// One listed name, fully qualified from the bucket root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEntry {
    /// A stored object key
    Object(String),
    /// A common prefix ending with the separator
    Prefix(String),
}

impl DirEntry {
    pub fn key(&self) -> &str {
        match self {
            DirEntry::Object(key) | DirEntry::Prefix(key) => key,
        }
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self, DirEntry::Prefix(_))
    }
}

/// Pagination state of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCursor {
    pub bucket: String,
    pub prefix: Option<String>,
    pub delimiter: String,
    pub marker: Option<String>,
    pub has_more: bool,
}

impl ListingCursor {
    fn request(&self, page_size: u32) -> ListObjectsRequest {
        let mut request = ListObjectsRequest::new(&self.bucket)
            .delimiter(&self.delimiter)
            .max_keys(page_size);
        request.prefix = self.prefix.clone();
        request.marker = self.marker.clone();
        request
    }
}

/// Lazy, restartable listing of the entries directly under a prefix
///
/// # Examples
///
/// ```
/// use bucketfs::store::{MemoryStore, ObjectStore, PutObjectRequest};
/// use bucketfs::{DirectoryIterator, Locator};
/// use std::sync::Arc;
///
/// let store = MemoryStore::with_bucket("bucket");
/// for key in ["a/x", "a/y", "a/z/1"] {
///     store.put_object(PutObjectRequest::new("bucket", key, Vec::new()))?;
/// }
///
/// let dir = DirectoryIterator::open(Arc::new(store), &Locator::new("bucket", "a"), "/", 1000);
/// let keys: Vec<String> = dir
///     .map(|entry| entry.map(|e| e.key().to_string()))
///     .collect::<Result<_, _>>()?;
/// assert_eq!(keys, ["a/x", "a/y", "a/z/"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DirectoryIterator {
    store: Arc<dyn ObjectStore>,
    cursor: Option<ListingCursor>,
    pending: VecDeque<DirEntry>,
    page_size: u32,
}

impl DirectoryIterator {
    /// Start a listing; no storage call is made until the first entry is read
    pub fn open(
        store: Arc<dyn ObjectStore>,
        locator: &Locator,
        separator: &str,
        page_size: u32,
    ) -> Self {
        let prefix = if locator.key.is_empty() {
            None
        } else if locator.key.ends_with(separator) {
            Some(locator.key.clone())
        } else {
            Some(format!("{}{}", locator.key, separator))
        };

        DirectoryIterator {
            store,
            cursor: Some(ListingCursor {
                bucket: locator.bucket.clone(),
                prefix,
                delimiter: separator.to_string(),
                marker: None,
                has_more: true,
            }),
            pending: VecDeque::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn cursor(&self) -> Option<&ListingCursor> {
        self.cursor.as_ref()
    }

    /// Next entry, fetching another page if needed
    ///
    /// Returns `Ok(None)` once the listing is exhausted or closed.
    pub fn next_entry(&mut self) -> Result<Option<DirEntry>> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Ok(Some(entry));
            }

            let Some(cursor) = self.cursor.as_mut() else {
                return Ok(None);
            };
            if !cursor.has_more {
                return Ok(None);
            }

            let page = self.store.list_objects(&cursor.request(self.page_size))?;
            debug!(
                "Listed {} objects and {} prefixes under {}/{}",
                page.contents.len(),
                page.common_prefixes.len(),
                cursor.bucket,
                cursor.prefix.as_deref().unwrap_or("")
            );

            if page.is_truncated {
                let last_key = page.contents.last().map(|o| o.key.as_str());
                let last_prefix = page.common_prefixes.last().map(String::as_str);
                let fallback = last_key.max(last_prefix).map(str::to_string);
                cursor.marker = page.next_marker.clone().or(fallback);
                // A truncated page without a usable marker would repeat forever
                cursor.has_more = cursor.marker.is_some();
            } else {
                cursor.has_more = false;
            }

            self.pending
                .extend(page.contents.into_iter().map(|o| DirEntry::Object(o.key)));
            self.pending
                .extend(page.common_prefixes.into_iter().map(DirEntry::Prefix));
        }
    }

    /// Restart from the first entry
    pub fn rewind(&mut self) {
        self.pending.clear();
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.marker = None;
            cursor.has_more = true;
        }
    }

    /// Release listing state; later reads return end-of-sequence
    pub fn close(&mut self) {
        self.pending.clear();
        self.cursor = None;
    }
}

impl Iterator for DirectoryIterator {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
