//! Configured adapter instance
//!
//! A [`StreamAdapter`] ties one [`AdapterConfig`] to a storage client and
//! exposes the file-like verbs. The client is built on first use and reused
//! for every later call.

use crate::config::AdapterConfig;
use crate::dir::DirectoryIterator;
use crate::error::Result;
use crate::locator::Locator;
use crate::mime::{self, ContentTypeTable};
use crate::mode::OpenPolicy;
use crate::session::StreamSession;
use crate::stat::{StatRecord, StatSynthesizer};
use crate::store::{ObjectStore, StoreFactory};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

/// Filesystem-style access to one object storage account
///
/// # Examples
///
/// ```
/// use bucketfs::store::{MemoryStore, MemoryStoreFactory};
/// use bucketfs::{AdapterConfig, StreamAdapter};
/// use std::sync::Arc;
///
/// let factory = Arc::new(MemoryStoreFactory::new(MemoryStore::with_bucket("bucket")));
/// let adapter = StreamAdapter::new(AdapterConfig::default(), factory)?;
///
/// let mut file = adapter.open("s3://bucket/hello.txt", "w")?;
/// file.write(b"hello");
/// file.close()?;
///
/// assert_eq!(adapter.stat("s3://bucket/hello.txt")?.size, 5);
/// # Ok::<(), bucketfs::BucketFsError>(())
/// ```
pub struct StreamAdapter {
    config: AdapterConfig,
    factory: Arc<dyn StoreFactory>,
    client: OnceCell<Arc<dyn ObjectStore>>,
    content_types: Arc<ContentTypeTable>,
}

impl StreamAdapter {
    /// Build an adapter using the process-wide content type table
    pub fn new(config: AdapterConfig, factory: Arc<dyn StoreFactory>) -> Result<Self> {
        Self::with_content_types(config, factory, mime::global())
    }

    /// Build an adapter with its own content type table
    pub fn with_content_types(
        config: AdapterConfig,
        factory: Arc<dyn StoreFactory>,
        content_types: Arc<ContentTypeTable>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(StreamAdapter {
            config,
            factory,
            client: OnceCell::new(),
            content_types,
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Name of the factory that builds this adapter's client
    pub fn factory_name(&self) -> &str {
        self.factory.name()
    }

    /// The storage client, connecting on first call
    pub fn client(&self) -> Result<Arc<dyn ObjectStore>> {
        let client = self.client.get_or_try_init(|| {
            debug!("Connecting storage client via {}", self.factory.name());
            self.factory.connect(&self.config.client)
        })?;
        Ok(client.clone())
    }

    fn stats(&self) -> Result<StatSynthesizer> {
        Ok(StatSynthesizer::new(self.client()?, &self.config.separator))
    }

    fn locate(&self, path: &str, dir: bool) -> Result<Locator> {
        Locator::parse(path, &self.config.separator, dir)
    }

    /// Open `path` with an fopen-style mode
    pub fn open(&self, path: &str, mode: &str) -> Result<StreamSession> {
        let policy = OpenPolicy::from_mode(mode)?;
        let locator = self.locate(path, false)?;
        StreamSession::open(
            self.client()?,
            locator,
            policy,
            self.config.write.clone(),
            self.content_types.clone(),
        )
        .map(|session| session.with_separator(&self.config.separator))
    }

    /// List the entries directly under `path`
    pub fn open_dir(&self, path: &str) -> Result<DirectoryIterator> {
        let locator = self.locate(path, true)?;
        Ok(DirectoryIterator::open(
            self.client()?,
            &locator,
            &self.config.separator,
            self.config.page_size,
        ))
    }

    pub fn stat(&self, path: &str) -> Result<StatRecord> {
        let locator = self.locate(path, true)?;
        self.stats()?.stat_path(&locator)
    }

    /// Create a directory marker, applying the configured ACL
    pub fn mkdir(&self, path: &str) -> Result<()> {
        let locator = self.locate(path, false)?;
        self.stats()?
            .mkdir(&locator, self.config.write.acl.as_deref())
    }

    pub fn rmdir(&self, path: &str) -> Result<()> {
        let locator = self.locate(path, false)?;
        self.stats()?.rmdir(&locator)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        let locator = self.locate(path, false)?;
        self.stats()?.unlink(&locator)
    }

    /// Always fails with `UnsupportedOperation`
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = self.locate(from, false)?;
        let to = self.locate(to, false)?;
        self.stats()?.rename(&from, &to)
    }
}

impl std::fmt::Debug for StreamAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAdapter")
            .field("factory", &self.factory.name())
            .field("connected", &self.client.get().is_some())
            .field("separator", &self.config.separator)
            .field("page_size", &self.config.page_size)
            .finish()
    }
}
