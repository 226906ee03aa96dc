//! Open file handles
//!
//! A [`StreamSession`] buffers the whole object in memory. Reads and writes
//! work on the buffer; the object is only rewritten on [`StreamSession::flush`]
//! or [`StreamSession::close`], and only if the buffer changed.

use crate::buffer::{ByteBuffer, Whence};
use crate::config::WriteOptions;
use crate::error::{BucketFsError, Result};
use crate::locator::{Locator, DEFAULT_SEPARATOR};
use crate::mime::ContentTypeTable;
use crate::mode::OpenPolicy;
use crate::stat::StatRecord;
use crate::store::{ObjectHead, ObjectStore, PutObjectRequest};
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State of one open object
pub struct StreamSession {
    store: Arc<dyn ObjectStore>,
    locator: Locator,
    buffer: Option<ByteBuffer>,
    head: Option<ObjectHead>,
    dirty: bool,
    writable: bool,
    options: WriteOptions,
    content_types: Arc<ContentTypeTable>,
    separator: String,
}

impl StreamSession {
    /// Open a session on `locator` according to `policy`
    ///
    /// Issues at most one storage call: a GET when the policy loads, a HEAD
    /// for exclusive create, nothing otherwise.
    pub fn open(
        store: Arc<dyn ObjectStore>,
        locator: Locator,
        policy: OpenPolicy,
        options: WriteOptions,
        content_types: Arc<ContentTypeTable>,
    ) -> Result<Self> {
        if locator.is_root() {
            return Err(BucketFsError::InvalidLocator(format!(
                "cannot open bucket root {} as a file",
                locator.bucket
            )));
        }

        let mut buffer = ByteBuffer::new();
        let mut head = None;
        let mut dirty = true;

        if policy.require_absent && store.object_exists(&locator.bucket, &locator.key)? {
            return Err(BucketFsError::ObjectExists(locator.to_string()));
        }

        if policy.load {
            match store.get_object(&locator.bucket, &locator.key) {
                Ok(output) => {
                    buffer = ByteBuffer::from_vec(output.body);
                    head = Some(output.head);
                    dirty = false;
                }
                Err(e) if e.is_not_found() => {
                    if policy.require_exists {
                        return Err(BucketFsError::ObjectNotFound(locator.to_string()));
                    }
                    debug!("{} is absent, starting empty", locator);
                }
                Err(e) => return Err(e.into()),
            }

            if policy.append_at_end {
                buffer.seek(0, Whence::End);
            }
        }

        debug!(
            "Opened {} ({} bytes, writable={})",
            locator,
            buffer.len(),
            policy.writable
        );

        Ok(StreamSession {
            store,
            locator,
            buffer: Some(buffer),
            head,
            dirty,
            writable: policy.writable,
            options,
            content_types,
            separator: DEFAULT_SEPARATOR.to_string(),
        })
    }

    /// Key separator used to find the extension when resolving the content type
    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Headers of the loaded object, if it was fetched on open
    pub fn head(&self) -> Option<&ObjectHead> {
        self.head.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Buffered content length
    pub fn len(&self) -> u64 {
        self.buffer.as_ref().map_or(0, ByteBuffer::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read up to `count` bytes; empty at end of data or once closed
    pub fn read(&mut self, count: usize) -> Vec<u8> {
        match self.buffer.as_mut() {
            Some(buffer) => buffer.read(count),
            None => Vec::new(),
        }
    }

    /// Write at the cursor
    ///
    /// Returns the number of bytes written, 0 on a read-only or closed
    /// session.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if !self.writable {
            return 0;
        }
        match self.buffer.as_mut() {
            Some(buffer) => {
                let n = buffer.write(bytes);
                if n > 0 {
                    self.dirty = true;
                }
                n
            }
            None => 0,
        }
    }

    pub fn seek(&mut self, offset: i64, whence: Whence) -> bool {
        self.buffer
            .as_mut()
            .map_or(false, |buffer| buffer.seek(offset, whence))
    }

    pub fn tell(&self) -> u64 {
        self.buffer.as_ref().map_or(0, ByteBuffer::position)
    }

    pub fn eof(&self) -> bool {
        self.buffer.as_ref().map_or(true, ByteBuffer::eof)
    }

    /// Resize the buffered content; the cursor does not move
    pub fn truncate(&mut self, size: u64) -> bool {
        if !self.writable {
            return false;
        }
        let Some(buffer) = self.buffer.as_mut() else {
            return false;
        };

        let before = buffer.len();
        if !buffer.truncate(size) {
            return false;
        }
        if before != size {
            self.dirty = true;
        }
        true
    }

    /// Commit the buffer if it changed since the last commit
    ///
    /// On failure the session keeps its buffer and stays dirty so the flush
    /// can be retried.
    pub fn flush(&mut self) -> Result<()> {
        if !self.writable || !self.dirty {
            return Ok(());
        }
        let Some(buffer) = self.buffer.as_ref() else {
            return Ok(());
        };

        let request = self.put_request(buffer.as_slice().to_vec());
        let content_type = request.content_type.clone().unwrap_or_default();
        let size = request.body.len();

        let etag = self.store.put_object(request)?;
        self.dirty = false;

        info!(
            "Committed {} ({} bytes, {}, etag {})",
            self.locator, size, content_type, etag
        );
        Ok(())
    }

    fn put_request(&self, body: Vec<u8>) -> PutObjectRequest {
        let opts = &self.options;
        let content_type = opts.content_type.clone().unwrap_or_else(|| {
            self.content_types
                .resolve_in(&self.locator.key, &self.separator)
                .to_string()
        });

        PutObjectRequest {
            acl: opts.acl.clone(),
            content_type: Some(content_type),
            cache_control: opts.cache_control.clone(),
            content_disposition: opts.content_disposition.clone(),
            content_encoding: opts.content_encoding.clone(),
            content_language: opts.content_language.clone(),
            expires: opts.expires.clone(),
            metadata: opts.metadata.clone(),
            ..PutObjectRequest::new(&self.locator.bucket, &self.locator.key, body)
        }
    }

    /// Flush and release the buffer
    ///
    /// Closing twice is a no-op. If the flush fails the error is returned and
    /// the session stays open.
    pub fn close(&mut self) -> Result<()> {
        if self.buffer.is_none() {
            return Ok(());
        }

        self.flush()?;

        self.buffer = None;
        self.head = None;
        self.dirty = false;
        self.writable = false;
        debug!("Closed {}", self.locator);
        Ok(())
    }

    /// Advisory locks cannot be held on a remote object
    pub fn lock(&self) -> Result<()> {
        Err(BucketFsError::UnsupportedOperation(format!(
            "lock {}",
            self.locator
        )))
    }

    /// File record for the open handle
    pub fn stat(&self) -> StatRecord {
        StatRecord::file(self.len(), chrono::Utc::now())
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.dirty && self.buffer.is_some() {
            if let Err(e) = self.close() {
                warn!("Dropped {} with uncommitted changes: {}", self.locator, e);
            }
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("locator", &self.locator)
            .field("len", &self.len())
            .field("position", &self.tell())
            .field("dirty", &self.dirty)
            .field("writable", &self.writable)
            .field("open", &self.is_open())
            .finish()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "session is closed")
}

impl io::Read for StreamSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let buffer = self.buffer.as_mut().ok_or_else(closed_error)?;
        Ok(buffer.read_into(buf))
    }
}

impl io::Write for StreamSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.buffer.is_none() {
            return Err(closed_error());
        }
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "session is read-only",
            ));
        }
        Ok(StreamSession::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        StreamSession::flush(self).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl io::Seek for StreamSession {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => (
                i64::try_from(n).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset too large")
                })?,
                Whence::Set,
            ),
            io::SeekFrom::Current(n) => (n, Whence::Current),
            io::SeekFrom::End(n) => (n, Whence::End),
        };

        if self.buffer.is_none() {
            return Err(closed_error());
        }
        if !StreamSession::seek(self, offset, whence) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }
        Ok(self.tell())
    }
}
