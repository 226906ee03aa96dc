//! Open mode interpretation
//!
//! Maps fopen-style mode tokens onto what a session has to do with the
//! backing object when it is opened.

use crate::error::{BucketFsError, Result};
use std::borrow::Cow;

/// Policy derived from an open mode
///
/// | mode   | load | require_exists | require_absent | writable | append_at_end |
/// |--------|------|----------------|----------------|----------|---------------|
/// | r      | yes  | yes            | no             | no       | no            |
/// | r+     | yes  | no             | no             | yes      | no            |
/// | w, w+  | no   | no             | no             | yes      | no            |
/// | a, a+  | yes  | no             | no             | yes      | yes           |
/// | x, x+  | no   | no             | yes            | yes      | no            |
///
/// `c` and `c+` are rejected: object storage cannot open without either
/// truncating or loading.
///
/// `w+` truncates like `w` instead of loading the existing object, so a
/// reader on a `w+` session only sees what it wrote itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenPolicy {
    /// Fetch the existing object into the buffer
    pub load: bool,
    /// Fail with `ObjectNotFound` if the object is absent
    pub require_exists: bool,
    /// Fail with `ObjectExists` if the object is present
    pub require_absent: bool,
    /// Writes are accepted and committed on flush
    pub writable: bool,
    /// Start with the cursor at the end of the loaded content
    pub append_at_end: bool,
}

impl OpenPolicy {
    /// Interpret a mode token
    ///
    /// A single binary flag `b` after the mode letter or at the end is
    /// ignored, so `rb`, `rb+` and `r+b` mean the same as `r` or `r+`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketfs::OpenPolicy;
    ///
    /// let policy = OpenPolicy::from_mode("rb")?;
    /// assert!(policy.require_exists);
    /// assert!(!policy.writable);
    ///
    /// assert!(OpenPolicy::from_mode("c").is_err());
    /// # Ok::<(), bucketfs::BucketFsError>(())
    /// ```
    pub fn from_mode(mode: &str) -> Result<Self> {
        let token = strip_binary_flag(mode);

        let policy = match token.as_ref() {
            "r" => OpenPolicy {
                load: true,
                require_exists: true,
                ..Default::default()
            },
            "r+" => OpenPolicy {
                load: true,
                writable: true,
                ..Default::default()
            },
            "w" | "w+" => OpenPolicy {
                writable: true,
                ..Default::default()
            },
            "a" | "a+" => OpenPolicy {
                load: true,
                writable: true,
                append_at_end: true,
                ..Default::default()
            },
            "x" | "x+" => OpenPolicy {
                require_absent: true,
                writable: true,
                ..Default::default()
            },
            "c" | "c+" => {
                return Err(BucketFsError::InvalidMode(format!(
                    "mode '{}' is not supported on object storage",
                    mode
                )))
            }
            _ => return Err(BucketFsError::InvalidMode(mode.to_string())),
        };

        Ok(policy)
    }
}

/// Drop one `b` at index 1 or at the end; anything else is left for the
/// match to reject
fn strip_binary_flag(mode: &str) -> Cow<'_, str> {
    let Some(idx) = mode.find('b') else {
        return Cow::Borrowed(mode);
    };
    let positioned = idx == 1 || (idx > 0 && idx == mode.len() - 1);
    if !positioned || mode.matches('b').count() > 1 {
        return Cow::Borrowed(mode);
    }
    Cow::Owned(format!("{}{}", &mode[..idx], &mode[idx + 1..]))
}
