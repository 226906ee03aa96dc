//! Scheme registry
//!
//! Maps scheme names (`s3`, `minio`, ...) to configured adapters and routes
//! path-based calls to the adapter owning the path's scheme. The registry is
//! an ordinary value owned by the application.

use crate::adapter::StreamAdapter;
use crate::config::AdapterConfig;
use crate::dir::DirectoryIterator;
use crate::error::{BucketFsError, Result};
use crate::locator::scheme_of;
use crate::session::StreamSession;
use crate::stat::StatRecord;
use crate::store::{MemoryStoreFactory, StoreFactory};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Scheme used by [`AdapterRegistry::register_default`]
pub const DEFAULT_SCHEME: &str = "s3";

/// Adapters keyed by scheme
///
/// New registrations use the current client factory. Changing the factory
/// does not affect adapters that are already registered.
///
/// # Examples
///
/// ```
/// use bucketfs::{AdapterConfig, AdapterRegistry};
///
/// let registry = AdapterRegistry::new();
/// let config = AdapterConfig::new().client_option("buckets", serde_json::json!(["media"]));
///
/// assert!(registry.register_default(config.clone())?);
/// assert!(!registry.register_default(config)?);
///
/// registry.mkdir("s3://media/photos")?;
/// assert!(registry.stat("s3://media/photos/")?.is_dir());
/// # Ok::<(), bucketfs::BucketFsError>(())
/// ```
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Arc<StreamAdapter>>>,
    factory: RwLock<Arc<dyn StoreFactory>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    /// Empty registry using [`MemoryStoreFactory`]
    pub fn new() -> Self {
        Self::with_client_factory(Arc::new(MemoryStoreFactory::default()))
    }

    pub fn with_client_factory(factory: Arc<dyn StoreFactory>) -> Self {
        AdapterRegistry {
            adapters: RwLock::new(HashMap::new()),
            factory: RwLock::new(factory),
        }
    }

    /// Register an adapter for `scheme`
    ///
    /// Returns `false`, leaving the existing adapter in place, if the scheme
    /// is already registered.
    pub fn register(&self, scheme: &str, config: AdapterConfig) -> Result<bool> {
        let mut adapters = self.adapters.write();
        if adapters.contains_key(scheme) {
            debug!("Scheme {} already registered", scheme);
            return Ok(false);
        }

        let factory = self.factory.read().clone();
        let adapter = StreamAdapter::new(config, factory)?;
        info!(
            "Registered scheme {} using {} client",
            scheme,
            adapter.factory_name()
        );
        adapters.insert(scheme.to_string(), Arc::new(adapter));
        Ok(true)
    }

    /// Register under [`DEFAULT_SCHEME`]
    pub fn register_default(&self, config: AdapterConfig) -> Result<bool> {
        self.register(DEFAULT_SCHEME, config)
    }

    /// Remove a scheme. Returns false if it was not registered.
    pub fn unregister(&self, scheme: &str) -> bool {
        let removed = self.adapters.write().remove(scheme).is_some();
        if removed {
            info!("Unregistered scheme {}", scheme);
        }
        removed
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.adapters.read().contains_key(scheme)
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.adapters.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    pub fn adapter(&self, scheme: &str) -> Option<Arc<StreamAdapter>> {
        self.adapters.read().get(scheme).cloned()
    }

    /// Use `factory` for adapters registered from now on
    pub fn set_client_factory(&self, factory: Arc<dyn StoreFactory>) {
        info!("Client factory set to {}", factory.name());
        *self.factory.write() = factory;
    }

    /// Go back to [`MemoryStoreFactory`]
    pub fn reset_client_factory(&self) {
        self.set_client_factory(Arc::new(MemoryStoreFactory::default()));
    }

    pub fn client_factory_name(&self) -> String {
        self.factory.read().name().to_string()
    }

    fn resolve(&self, path: &str) -> Result<Arc<StreamAdapter>> {
        let scheme = scheme_of(path)?;
        self.adapter(scheme)
            .ok_or_else(|| BucketFsError::UnknownScheme(scheme.to_string()))
    }

    pub fn open(&self, path: &str, mode: &str) -> Result<StreamSession> {
        self.resolve(path)?.open(path, mode)
    }

    pub fn open_dir(&self, path: &str) -> Result<DirectoryIterator> {
        self.resolve(path)?.open_dir(path)
    }

    pub fn stat(&self, path: &str) -> Result<StatRecord> {
        self.resolve(path)?.stat(path)
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.resolve(path)?.mkdir(path)
    }

    pub fn rmdir(&self, path: &str) -> Result<()> {
        self.resolve(path)?.rmdir(path)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        self.resolve(path)?.unlink(path)
    }

    /// Always fails; both paths must use the same scheme
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let adapter = self.resolve(from)?;
        if scheme_of(to)? != scheme_of(from)? {
            return Err(BucketFsError::UnsupportedOperation(format!(
                "rename across schemes: {} -> {}",
                from, to
            )));
        }
        adapter.rename(from, to)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("schemes", &self.schemes())
            .field("factory", &self.client_factory_name())
            .finish()
    }
}
