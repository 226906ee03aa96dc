//! Adapter configuration
//!
//! Options are read from TOML or JSON and validated before an adapter is
//! built. Header option names (`ContentType`, `CacheControl`, ...) follow the
//! object storage request field names so existing configuration files carry
//! over unchanged.

use crate::error::Result;
use crate::locator::DEFAULT_SEPARATOR;
use crate::store::ClientOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Default number of keys requested per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Headers and metadata attached to every committed object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Canned ACL, e.g. "private" or "public-read"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,

    /// Overrides the type resolved from the key extension
    #[serde(
        rename = "ContentType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,

    #[serde(
        rename = "CacheControl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_control: Option<String>,

    #[serde(
        rename = "ContentDisposition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_disposition: Option<String>,

    #[serde(
        rename = "ContentEncoding",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_encoding: Option<String>,

    #[serde(
        rename = "ContentLanguage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_language: Option<String>,

    #[serde(rename = "Expires", default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,

    /// User metadata sent with each object
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Configuration of one adapter instance
///
/// # Examples
///
/// ```
/// use bucketfs::AdapterConfig;
///
/// let config = AdapterConfig::from_toml_str(r#"
///     separator = "/"
///     page_size = 500
///     acl = "public-read"
///     CacheControl = "max-age=60"
///
///     [client]
///     region = "eu-west-1"
/// "#)?;
///
/// assert_eq!(config.page_size, 500);
/// assert_eq!(config.write.cache_control.as_deref(), Some("max-age=60"));
/// assert_eq!(config.client["region"], "eu-west-1");
/// # Ok::<(), bucketfs::BucketFsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AdapterConfig {
    /// Forwarded verbatim to the client factory
    #[serde(default)]
    pub client: ClientOptions,

    /// Key separator used to emulate directories
    #[serde(default = "default_separator")]
    #[validate(length(min = 1, message = "separator must not be empty"))]
    pub separator: String,

    /// Keys requested per listing call
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,

    #[serde(flatten)]
    pub write: WriteOptions,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            client: ClientOptions::new(),
            separator: default_separator(),
            page_size: DEFAULT_PAGE_SIZE,
            write: WriteOptions::default(),
        }
    }
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AdapterConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: AdapterConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or TOML for any other extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_toml_str(&text)?
        };

        debug!("Loaded adapter config from {:?}", path);
        Ok(config)
    }

    /// Set one client option
    pub fn client_option(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.client.insert(name.to_string(), value.into());
        self
    }

    pub fn separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn acl(mut self, acl: &str) -> Self {
        self.write.acl = Some(acl.to_string());
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.write.content_type = Some(content_type.to_string());
        self
    }

    pub fn cache_control(mut self, value: &str) -> Self {
        self.write.cache_control = Some(value.to_string());
        self
    }

    pub fn content_disposition(mut self, value: &str) -> Self {
        self.write.content_disposition = Some(value.to_string());
        self
    }

    pub fn content_encoding(mut self, value: &str) -> Self {
        self.write.content_encoding = Some(value.to_string());
        self
    }

    pub fn content_language(mut self, value: &str) -> Self {
        self.write.content_language = Some(value.to_string());
        self
    }

    pub fn expires(mut self, value: &str) -> Self {
        self.write.expires = Some(value.to_string());
        self
    }

    /// Add one user metadata entry
    pub fn metadata(mut self, name: &str, value: &str) -> Self {
        self.write
            .metadata
            .insert(name.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BucketFsError;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::from_toml_str("").unwrap();
        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.separator, "/");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.client.is_empty());
        assert_eq!(config.write, WriteOptions::default());
    }

    #[test]
    fn test_json_option_names() {
        let config = AdapterConfig::from_json_str(
            r#"{
                "client": {"endpoint": "http://localhost:9000"},
                "ContentType": "text/csv",
                "ContentEncoding": "gzip",
                "ContentLanguage": "en",
                "ContentDisposition": "attachment",
                "Expires": "Thu, 01 Dec 1994 16:00:00 GMT",
                "metadata": {"owner": "ops"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.write.content_type.as_deref(), Some("text/csv"));
        assert_eq!(config.write.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(config.write.content_language.as_deref(), Some("en"));
        assert_eq!(
            config.write.content_disposition.as_deref(),
            Some("attachment")
        );
        assert!(config.write.expires.is_some());
        assert_eq!(config.write.metadata["owner"], "ops");
        assert_eq!(config.client["endpoint"], "http://localhost:9000");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = AdapterConfig::from_toml_str("separator = \"\"").unwrap_err();
        assert!(matches!(err, BucketFsError::Config(_)));

        let err = AdapterConfig::from_toml_str("page_size = 0").unwrap_err();
        assert!(matches!(err, BucketFsError::Config(_)));

        let err = AdapterConfig::from_json_str(r#"{"page_size": 1001}"#).unwrap_err();
        assert!(matches!(err, BucketFsError::Config(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            AdapterConfig::from_toml_str("page_size = \"many\""),
            Err(BucketFsError::Toml(_))
        ));
        assert!(matches!(
            AdapterConfig::from_json_str("{"),
            Err(BucketFsError::Json(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = AdapterConfig::new()
            .separator(":")
            .page_size(10)
            .acl("private")
            .content_type("text/plain")
            .cache_control("no-cache")
            .metadata("team", "storage")
            .client_option("buckets", serde_json::json!(["media"]));

        assert_eq!(config.separator, ":");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.write.acl.as_deref(), Some("private"));
        assert_eq!(config.write.metadata.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("adapter.toml");
        let mut file = std::fs::File::create(&toml_path).unwrap();
        writeln!(file, "page_size = 25").unwrap();
        assert_eq!(AdapterConfig::from_file(&toml_path).unwrap().page_size, 25);

        let json_path = dir.path().join("adapter.json");
        std::fs::write(&json_path, r#"{"separator": "|"}"#).unwrap();
        assert_eq!(AdapterConfig::from_file(&json_path).unwrap().separator, "|");

        assert!(matches!(
            AdapterConfig::from_file(dir.path().join("missing.toml")),
            Err(BucketFsError::Io(_))
        ));
    }
}
