//! Content type resolution
//!
//! Maps a key's file extension to a MIME type using an immutable
//! extension table. The table is set once per process, either explicitly at
//! start-up with [`install`] or lazily from the built-in mapping on first use.

use crate::error::Result;
use crate::locator::DEFAULT_SEPARATOR;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Content type used when the extension is missing or unknown
pub const FALLBACK_CONTENT_TYPE: &str = "binary/octet-stream";

static BUILTIN_TABLE: &str = include_str!("../data/mime.json");

static GLOBAL_TABLE: OnceCell<Arc<ContentTypeTable>> = OnceCell::new();

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"#.*$").unwrap());
static ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\S+/\S+)\s+(\S.*?)\s*$").unwrap());

/// Lowercase extension (no dot) → MIME type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypeTable {
    types: HashMap<String, String>,
}

impl ContentTypeTable {
    /// Table with no entries; everything resolves to the fallback
    pub fn empty() -> Self {
        Self::default()
    }

    /// The mapping shipped with the crate
    pub fn builtin() -> Self {
        // The embedded file is checked by the tests below
        Self::from_json(BUILTIN_TABLE).unwrap_or_default()
    }

    /// Parse a flat JSON object of extension → MIME type
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::from_pairs(raw))
    }

    /// Load a JSON table from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        debug!("Loaded {} content types from {:?}", table.len(), path);
        Ok(table)
    }

    /// Parse the `mime.types` text format
    ///
    /// Each non-comment line is a MIME type followed by its extensions:
    ///
    /// ```text
    /// # comment
    /// text/plain     txt text conf
    /// ```
    ///
    /// Later lines win when an extension appears twice.
    pub fn from_mime_types(text: &str) -> Self {
        let mut types = HashMap::new();
        for line in text.lines() {
            let line = COMMENT.replace(line.trim(), "");
            if let Some(caps) = ENTRY.captures(&line) {
                let mime = &caps[1];
                for ext in caps[2].split_whitespace() {
                    types.insert(ext.to_lowercase(), mime.to_string());
                }
            }
        }

        ContentTypeTable { types }
    }

    fn from_pairs(raw: HashMap<String, String>) -> Self {
        let types = raw
            .into_iter()
            .map(|(ext, mime)| (ext.trim_start_matches('.').to_lowercase(), mime))
            .collect();
        ContentTypeTable { types }
    }

    /// Number of known extensions
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// MIME type for an extension (case-insensitive, no dot)
    pub fn lookup(&self, extension: &str) -> Option<&str> {
        self.types
            .get(&extension.to_lowercase())
            .map(String::as_str)
    }

    /// MIME type for a key, or [`FALLBACK_CONTENT_TYPE`]
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketfs::mime::{ContentTypeTable, FALLBACK_CONTENT_TYPE};
    ///
    /// let table = ContentTypeTable::builtin();
    /// assert_eq!(table.resolve("docs/README.TXT"), "text/plain");
    /// assert_eq!(table.resolve("docs/README"), FALLBACK_CONTENT_TYPE);
    /// ```
    pub fn resolve(&self, key: &str) -> &str {
        self.resolve_in(key, DEFAULT_SEPARATOR)
    }

    /// Like [`resolve`](Self::resolve) for keys using a custom separator
    ///
    /// The extension is taken from the last segment after splitting on both
    /// `/` and `separator`.
    pub fn resolve_in(&self, key: &str, separator: &str) -> &str {
        extension(key, separator)
            .and_then(|ext| self.lookup(ext))
            .unwrap_or(FALLBACK_CONTENT_TYPE)
    }
}

fn extension<'a>(key: &'a str, separator: &str) -> Option<&'a str> {
    let mut name = key.rsplit('/').next().unwrap_or(key);
    if !separator.is_empty() {
        name = name.rsplit(separator).next().unwrap_or(name);
    }
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Set the process-wide table
///
/// Call once at start-up. Returns the table back if one was already
/// installed or already initialized by [`global`].
pub fn install(table: ContentTypeTable) -> std::result::Result<(), ContentTypeTable> {
    let len = table.len();
    GLOBAL_TABLE
        .set(Arc::new(table))
        .map_err(|rejected| Arc::try_unwrap(rejected).unwrap_or_else(|arc| (*arc).clone()))?;
    info!("Installed content type table with {} extensions", len);
    Ok(())
}

/// The process-wide table, defaulting to [`ContentTypeTable::builtin`]
pub fn global() -> Arc<ContentTypeTable> {
    GLOBAL_TABLE
        .get_or_init(|| Arc::new(ContentTypeTable::builtin()))
        .clone()
}

/// Resolve a key against the process-wide table
pub fn resolve_content_type(key: &str) -> String {
    global().resolve(key).to_string()
}
