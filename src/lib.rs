//! # bucketfs - Filesystem-Style Access to Object Storage
//!
//! `bucketfs` lets code address objects in a bucket with the verbs it already
//! uses for files: open/read/write/seek, stat, mkdir/rmdir, directory listing
//! and unlink. Object storage has no directories, no partial writes and no open
//! handles, so each verb is rebuilt from get/put/head/delete/list:
//!
//! - **Buffered sessions**: an open file is an in-memory buffer, committed with
//!   a single PUT on flush or close, and only when it changed
//! - **Emulated directories**: zero-length marker keys plus common prefixes
//! - **Lazy listing**: directory pages are fetched only as entries are consumed
//! - **Pluggable clients**: storage is reached through the [`ObjectStore`]
//!   trait, built by a [`StoreFactory`] from opaque client options
//!
//! ## Quick Start
//!
//! ```rust
//! use bucketfs::{AdapterConfig, AdapterRegistry, Result};
//!
//! # fn main() -> Result<()> {
//! let registry = AdapterRegistry::new();
//! let config = AdapterConfig::new().client_option("buckets", serde_json::json!(["media"]));
//! registry.register("s3", config)?;
//!
//! // Write a file; it is committed on close
//! let mut file = registry.open("s3://media/notes/today.txt", "w")?;
//! file.write(b"Hello, World!");
//! file.close()?;
//!
//! // Read it back
//! let mut file = registry.open("s3://media/notes/today.txt", "r")?;
//! assert_eq!(file.read(1024), b"Hello, World!");
//!
//! // List the directory
//! for entry in registry.open_dir("s3://media/notes")? {
//!     println!("{}", entry?.key());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Storage Clients
//!
//! ```rust,no_run
//! use bucketfs::store::{ClientOptions, ObjectStore, StoreFactory, StoreResult};
//! use bucketfs::AdapterRegistry;
//! use std::sync::Arc;
//!
//! struct HttpFactory;
//!
//! impl StoreFactory for HttpFactory {
//!     fn name(&self) -> &str {
//!         "http"
//!     }
//!
//!     fn connect(&self, options: &ClientOptions) -> StoreResult<Arc<dyn ObjectStore>> {
//!         // build a real client from `options` here
//!         # unimplemented!()
//!     }
//! }
//!
//! let registry = AdapterRegistry::new();
//! registry.set_client_factory(Arc::new(HttpFactory));
//! ```

pub mod adapter;
pub mod buffer;
pub mod config;
pub mod dir;
pub mod error;
pub mod locator;
pub mod mime;
pub mod mode;
pub mod registry;
pub mod session;
pub mod stat;
pub mod store;

pub use adapter::StreamAdapter;
pub use buffer::{ByteBuffer, Whence};
pub use config::{AdapterConfig, WriteOptions};
pub use dir::{DirEntry, DirectoryIterator, ListingCursor};
pub use error::{BucketFsError, Result};
pub use locator::{Locator, DEFAULT_SEPARATOR};
pub use mime::ContentTypeTable;
pub use mode::OpenPolicy;
pub use registry::{AdapterRegistry, DEFAULT_SCHEME};
pub use session::StreamSession;
pub use stat::{FileKind, StatRecord, StatSynthesizer};
pub use store::{MemoryStore, MemoryStoreFactory, ObjectStore, StoreError, StoreFactory};
