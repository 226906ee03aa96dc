//! Locator parsing
//!
//! Turns `scheme://bucket/key` paths into a bucket and an object key.

use crate::error::{BucketFsError, Result};
use std::fmt;

/// Default key separator
pub const DEFAULT_SEPARATOR: &str = "/";

const SCHEME_DELIMITER: &str = "://";

/// A (bucket, key) address resolved from a scheme-qualified path
///
/// The key never starts with the separator. A trailing separator marks a
/// directory-marker key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub bucket: String,
    pub key: String,
}

impl Locator {
    /// Build a locator from parts
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Locator {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a `scheme://bucket/key` path
    ///
    /// With `dir` set, trailing separators are kept so the key can address a
    /// directory marker; otherwise they are stripped.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketfs::Locator;
    ///
    /// let loc = Locator::parse("s3://bucket/a/b/c/", "/", false)?;
    /// assert_eq!(loc.bucket, "bucket");
    /// assert_eq!(loc.key, "a/b/c");
    ///
    /// let dir = Locator::parse("s3://bucket/a/b/", "/", true)?;
    /// assert_eq!(dir.key, "a/b/");
    /// # Ok::<(), bucketfs::BucketFsError>(())
    /// ```
    pub fn parse(path: &str, separator: &str, dir: bool) -> Result<Self> {
        let (_, rest) = split_scheme(path)?;

        if rest.contains(|c| c == '?' || c == '#') {
            return Err(BucketFsError::InvalidLocator(format!(
                "query strings and fragments are not supported: {}",
                path
            )));
        }

        let (bucket, raw_key) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return Err(BucketFsError::InvalidLocator(format!(
                "missing bucket in {}",
                path
            )));
        }

        let mut key = raw_key.trim_start_matches('/');
        if !separator.is_empty() {
            key = key.trim_start_matches(separator);
            if !dir {
                key = key.trim_end_matches(separator);
            }
        }

        Ok(Locator::new(bucket, key))
    }

    /// True if the locator addresses the bucket itself
    pub fn is_root(&self) -> bool {
        self.key.is_empty()
    }

    /// Key of the directory marker object for this locator
    ///
    /// Example: key "docs" → "docs/"
    pub fn marker_key(&self, separator: &str) -> String {
        format!("{}{}", self.key.trim_end_matches(separator), separator)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Scheme of a `scheme://...` path
///
/// Example: "s3://bucket/key" → "s3"
pub fn scheme_of(path: &str) -> Result<&str> {
    split_scheme(path).map(|(scheme, _)| scheme)
}

fn split_scheme(path: &str) -> Result<(&str, &str)> {
    let idx = path.find(SCHEME_DELIMITER).ok_or_else(|| {
        BucketFsError::InvalidLocator(format!("expected scheme://bucket/key, got {}", path))
    })?;

    let scheme = &path[..idx];
    let valid_scheme = scheme
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return Err(BucketFsError::InvalidLocator(format!(
            "invalid scheme in {}",
            path
        )));
    }

    Ok((scheme, &path[idx + SCHEME_DELIMITER.len()..]))
}
