//! Named blobs with a modification timestamp.

use std::ops::Deref;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{Blob, BlobPart};
use crate::error::{Error, Result};

/// A [`Blob`] with a file name and last-modified time.
///
/// Derefs to the underlying blob for `size`, `slice`, `text` and friends.
#[derive(Clone, Debug)]
pub struct File {
    blob: Blob,
    name: String,
    last_modified: i64,
}

impl File {
    /// Build a file stamped with the current time.
    pub fn new<I, P>(parts: I, name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<BlobPart>,
    {
        Self::from_blob(Blob::new(parts), name, now_millis())
    }

    /// Start a builder for files that need a type or an explicit timestamp.
    pub fn builder() -> FileBuilder {
        FileBuilder::default()
    }

    pub(crate) fn from_blob(blob: Blob, name: impl Into<String>, last_modified: i64) -> Self {
        Self {
            blob,
            name: name.into(),
            last_modified,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Milliseconds since the Unix epoch.
    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    pub fn as_blob(&self) -> &Blob {
        &self.blob
    }

    pub fn into_blob(self) -> Blob {
        self.blob
    }
}

impl Deref for File {
    type Target = Blob;

    fn deref(&self) -> &Blob {
        &self.blob
    }
}

/// Raw input for a file's modification time.
///
/// Anything that does not coerce to a finite number resolves to "now".
#[derive(Debug, Clone)]
pub enum LastModified {
    Millis(f64),
    Text(String),
}

impl LastModified {
    pub fn resolve(&self) -> i64 {
        let millis = match self {
            LastModified::Millis(v) => *v,
            LastModified::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
        };
        if millis.is_finite() {
            millis.trunc() as i64
        } else {
            now_millis()
        }
    }
}

impl From<i64> for LastModified {
    fn from(v: i64) -> Self {
        LastModified::Millis(v as f64)
    }
}

impl From<f64> for LastModified {
    fn from(v: f64) -> Self {
        LastModified::Millis(v)
    }
}

impl From<&str> for LastModified {
    fn from(v: &str) -> Self {
        LastModified::Text(v.to_string())
    }
}

impl From<SystemTime> for LastModified {
    fn from(v: SystemTime) -> Self {
        LastModified::Millis(millis_since_epoch(v) as f64)
    }
}

/// Builder for [`File`]; the name is mandatory.
#[derive(Debug, Default)]
pub struct FileBuilder {
    parts: Vec<BlobPart>,
    name: Option<String>,
    content_type: String,
    last_modified: Option<LastModified>,
}

impl FileBuilder {
    pub fn part(mut self, part: impl Into<BlobPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn parts<I, P>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<BlobPart>,
    {
        self.parts.extend(parts.into_iter().map(Into::into));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn last_modified(mut self, value: impl Into<LastModified>) -> Self {
        self.last_modified = Some(value.into());
        self
    }

    /// Fails with [`Error::Argument`] when no name was given.
    pub fn build(self) -> Result<File> {
        let name = self.name.ok_or_else(|| {
            Error::Argument(
                "Failed to construct 'File': 2 arguments required, but only 1 present.".into(),
            )
        })?;
        let last_modified = self
            .last_modified
            .map(|v| v.resolve())
            .unwrap_or_else(now_millis);
        Ok(File::from_blob(
            Blob::with_type(self.parts, &self.content_type),
            name,
            last_modified,
        ))
    }
}

pub(crate) fn now_millis() -> i64 {
    millis_since_epoch(SystemTime::now())
}

pub(crate) fn millis_since_epoch(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_builder_requires_name() {
        let err = File::builder().part("abc").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_builder_fields() {
        let file = File::builder()
            .parts(["ab", "c"])
            .name("a.txt")
            .content_type("text/plain")
            .last_modified(42i64)
            .build()
            .unwrap();
        assert_eq!(file.name(), "a.txt");
        assert_eq!(file.content_type(), "text/plain");
        assert_eq!(file.last_modified(), 42);
        assert_eq!(file.text(), "abc");
    }

    #[test]
    fn test_last_modified_coercion() {
        let before = now_millis();
        assert_eq!(LastModified::from("1234").resolve(), 1234);
        assert_eq!(LastModified::from("").resolve(), 0);
        assert!(LastModified::from("yesterday").resolve() >= before);
        assert!(LastModified::from(f64::NAN).resolve() >= before);
        assert_eq!(LastModified::from(12.9).resolve(), 12);
    }

    #[test]
    fn test_default_last_modified_is_now() {
        let before = now_millis();
        let file = File::new(["x"], "x");
        assert!(file.last_modified() >= before);
    }
}
