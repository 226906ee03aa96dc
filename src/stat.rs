//! Metadata records and directory emulation
//!
//! Object storage only knows keys. Directories are either marker objects
//! (zero-length keys ending with the separator) or implied by keys sharing a
//! prefix. [`StatSynthesizer`] turns both into uniform [`StatRecord`]s and
//! implements mkdir/rmdir/unlink on top of plain object calls.

use crate::error::{BucketFsError, Result};
use crate::locator::Locator;
use crate::session::StreamSession;
use crate::store::{ListObjectsRequest, ObjectStore, PutObjectRequest};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Directory type bits plus rwxrwxrwx
pub const DIRECTORY_MODE: u32 = 0o040777;

/// Regular file type bits plus rwxrwxrwx
pub const FILE_MODE: u32 = 0o100777;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// stat(2)-shaped metadata record
///
/// Ownership, inode and block fields have no storage equivalent and are
/// fixed placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatRecord {
    pub kind: FileKind,
    pub size: u64,
    pub atime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
}

impl StatRecord {
    pub const DEV: i64 = 0;
    pub const INO: i64 = 0;
    pub const NLINK: i64 = 1;
    pub const UID: i64 = 0;
    pub const GID: i64 = 0;
    pub const RDEV: i64 = 0;
    pub const BLKSIZE: i64 = -1;
    pub const BLOCKS: i64 = -1;

    /// Regular file of `size` bytes, all timestamps set to `modified`
    pub fn file(size: u64, modified: DateTime<Utc>) -> Self {
        StatRecord {
            kind: FileKind::File,
            size,
            atime: modified,
            mtime: modified,
            ctime: modified,
        }
    }

    /// Empty directory with all timestamps set to `modified`
    pub fn directory(modified: DateTime<Utc>) -> Self {
        StatRecord {
            kind: FileKind::Directory,
            size: 0,
            atime: modified,
            mtime: modified,
            ctime: modified,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn mode(&self) -> u32 {
        match self.kind {
            FileKind::Directory => DIRECTORY_MODE,
            FileKind::File => FILE_MODE,
        }
    }

    /// Fields in stat(2) order: dev, ino, mode, nlink, uid, gid, rdev, size,
    /// atime, mtime, ctime, blksize, blocks
    pub fn to_array(&self) -> [i64; 13] {
        [
            Self::DEV,
            Self::INO,
            self.mode() as i64,
            Self::NLINK,
            Self::UID,
            Self::GID,
            Self::RDEV,
            i64::try_from(self.size).unwrap_or(i64::MAX),
            self.atime.timestamp(),
            self.mtime.timestamp(),
            self.ctime.timestamp(),
            Self::BLKSIZE,
            Self::BLOCKS,
        ]
    }
}

/// Directory emulation over an object store
pub struct StatSynthesizer {
    store: Arc<dyn ObjectStore>,
    separator: String,
}

impl StatSynthesizer {
    pub fn new(store: Arc<dyn ObjectStore>, separator: &str) -> Self {
        StatSynthesizer {
            store,
            separator: separator.to_string(),
        }
    }

    /// Stat a locator parsed in directory mode
    ///
    /// Lookup order: bucket root, the key itself, then any key under
    /// `key/`. A zero-length key ending with the separator is a directory.
    pub fn stat_path(&self, locator: &Locator) -> Result<StatRecord> {
        if locator.is_root() {
            return Ok(StatRecord::directory(Utc::now()));
        }

        match self.store.head_object(&locator.bucket, &locator.key) {
            Ok(head) => {
                if locator.key.ends_with(self.separator.as_str()) && head.content_length == 0 {
                    return Ok(StatRecord::directory(head.last_modified));
                }
                return Ok(StatRecord::file(head.content_length, head.last_modified));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let prefix = locator.marker_key(&self.separator);
        let request = ListObjectsRequest::new(&locator.bucket)
            .prefix(prefix)
            .max_keys(1);
        let page = self.store.list_objects(&request)?;

        if page.is_empty() {
            return Err(BucketFsError::ObjectNotFound(locator.to_string()));
        }

        debug!("{} is an implied directory", locator);
        Ok(StatRecord::directory(Utc::now()))
    }

    /// Stat an open handle from its buffer
    pub fn stat_session(&self, session: &StreamSession) -> StatRecord {
        session.stat()
    }

    /// Create the directory marker for `locator`
    ///
    /// Existing markers are overwritten; there is no pre-existence check.
    pub fn mkdir(&self, locator: &Locator, acl: Option<&str>) -> Result<()> {
        if locator.is_root() {
            return Err(BucketFsError::InvalidLocator(format!(
                "cannot create bucket root {}",
                locator.bucket
            )));
        }

        let marker = locator.marker_key(&self.separator);
        let mut request = PutObjectRequest::new(&locator.bucket, &marker, Vec::new());
        request.acl = acl.map(str::to_string);
        self.store.put_object(request)?;

        info!("Created directory {}/{}", locator.bucket, marker);
        Ok(())
    }

    /// Remove an empty directory marker
    pub fn rmdir(&self, locator: &Locator) -> Result<()> {
        if locator.is_root() {
            return Err(BucketFsError::InvalidLocator(format!(
                "cannot remove bucket root {}",
                locator.bucket
            )));
        }

        let marker = locator.marker_key(&self.separator);
        if !self.store.object_exists(&locator.bucket, &marker)? {
            return Err(BucketFsError::ObjectNotFound(format!(
                "{}/{}",
                locator.bucket, marker
            )));
        }

        // Listing starts after the marker itself, so only children show up
        let request = ListObjectsRequest::new(&locator.bucket)
            .prefix(&marker)
            .marker(&marker)
            .max_keys(1);
        if !self.store.list_objects(&request)?.is_empty() {
            return Err(BucketFsError::DirectoryNotEmpty(format!(
                "{}/{}",
                locator.bucket, marker
            )));
        }

        self.store.delete_object(&locator.bucket, &marker)?;
        info!("Removed directory {}/{}", locator.bucket, marker);
        Ok(())
    }

    /// Delete an object; deleting a missing key succeeds
    pub fn unlink(&self, locator: &Locator) -> Result<()> {
        self.store.delete_object(&locator.bucket, &locator.key)?;
        debug!("Unlinked {}", locator);
        Ok(())
    }

    /// Always fails: object storage has no atomic rename
    pub fn rename(&self, from: &Locator, to: &Locator) -> Result<()> {
        Err(BucketFsError::UnsupportedOperation(format!(
            "rename {} -> {}",
            from, to
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn setup(keys: &[(&str, &[u8])]) -> (MemoryStore, StatSynthesizer) {
        let mem = MemoryStore::with_bucket("bucket");
        for (key, body) in keys {
            mem.put_object(PutObjectRequest::new("bucket", *key, body.to_vec()))
                .unwrap();
        }
        let stats = StatSynthesizer::new(Arc::new(mem.clone()), "/");
        (mem, stats)
    }

    #[test]
    fn test_record_layout() {
        let when = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let file = StatRecord::file(12, when);
        assert_eq!(
            file.to_array(),
            [
                0,
                0,
                0o100777,
                1,
                0,
                0,
                0,
                12,
                1_700_000_000,
                1_700_000_000,
                1_700_000_000,
                -1,
                -1
            ]
        );

        let dir = StatRecord::directory(when);
        assert_eq!(dir.to_array()[2], 0o040777);
        assert_eq!(dir.size, 0);
    }

    #[test]
    fn test_stat_file_and_marker() {
        let (_, stats) = setup(&[("f.txt", b"hello"), ("d/", b"")]);

        let file = stats.stat_path(&Locator::new("bucket", "f.txt")).unwrap();
        assert!(file.is_file());
        assert_eq!(file.size, 5);

        let dir = stats.stat_path(&Locator::new("bucket", "d/")).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_stat_non_empty_slash_key_is_file() {
        let (_, stats) = setup(&[("odd/", b"data")]);
        let rec = stats.stat_path(&Locator::new("bucket", "odd/")).unwrap();
        assert!(rec.is_file());
        assert_eq!(rec.size, 4);
    }

    #[test]
    fn test_stat_implied_directory() {
        let (mem, stats) = setup(&[("e/f", b"x")]);
        let rec = stats.stat_path(&Locator::new("bucket", "e")).unwrap();
        assert!(rec.is_dir());
        assert_eq!(mem.calls().list, 1);
    }

    #[test]
    fn test_stat_missing() {
        let (_, stats) = setup(&[("ef", b"x")]);
        let err = stats.stat_path(&Locator::new("bucket", "e")).unwrap_err();
        assert!(matches!(err, BucketFsError::ObjectNotFound(_)));
    }

    #[test]
    fn test_stat_root() {
        let (mem, stats) = setup(&[]);
        assert!(stats.stat_path(&Locator::new("bucket", "")).unwrap().is_dir());
        assert_eq!(mem.calls().head + mem.calls().list, 0);
    }

    #[test]
    fn test_mkdir_rmdir() {
        let (mem, stats) = setup(&[]);
        let dir = Locator::new("bucket", "photos");

        stats.mkdir(&dir, Some("private")).unwrap();
        let marker = mem.object("bucket", "photos/").unwrap();
        assert!(marker.body.is_empty());
        assert_eq!(marker.acl.as_deref(), Some("private"));

        stats.rmdir(&dir).unwrap();
        assert!(mem.object("bucket", "photos/").is_none());

        assert!(matches!(
            stats.rmdir(&dir),
            Err(BucketFsError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_rmdir_not_empty() {
        let (mem, stats) = setup(&[("docs/", b""), ("docs/a.txt", b"a")]);
        let err = stats.rmdir(&Locator::new("bucket", "docs")).unwrap_err();
        assert!(matches!(err, BucketFsError::DirectoryNotEmpty(_)));
        assert!(mem.object("bucket", "docs/").is_some());
    }

    #[test]
    fn test_mkdir_root_rejected() {
        let (_, stats) = setup(&[]);
        assert!(matches!(
            stats.mkdir(&Locator::new("bucket", ""), None),
            Err(BucketFsError::InvalidLocator(_))
        ));
    }

    #[test]
    fn test_unlink_and_rename() {
        let (mem, stats) = setup(&[("gone", b"1")]);
        let loc = Locator::new("bucket", "gone");
        stats.unlink(&loc).unwrap();
        stats.unlink(&loc).unwrap();
        assert!(mem.object("bucket", "gone").is_none());

        assert!(matches!(
            stats.rename(&loc, &Locator::new("bucket", "other")),
            Err(BucketFsError::UnsupportedOperation(_))
        ));
    }
}
