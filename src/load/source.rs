use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::FetchError;

/// Byte transport keyed by locator strings.
///
/// Implementations must be shareable with the background decode worker.
pub trait ByteSource: Send + Sync {
    /// Fetch the full contents behind `locator`.
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

impl<T: ByteSource + ?Sized> ByteSource for Arc<T> {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(locator)
    }
}

/// Filesystem source resolving relative locators against a root directory.
#[derive(Clone, Debug)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory locators are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a locator maps to.
    pub fn resolve(&self, locator: &str) -> Result<PathBuf, FetchError> {
        let norm = normalize_locator(locator)?;
        Ok(self.root.join(Path::new(&norm)))
    }
}

impl ByteSource for FileSource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(locator)?;
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound {
                    locator: locator.to_owned(),
                }
            } else {
                FetchError::Io {
                    locator: locator.to_owned(),
                    source,
                }
            }
        })
    }
}

/// In-memory source mapping locators to shared buffers.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    entries: HashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `locator`, replacing any previous entry.
    pub fn insert(&mut self, locator: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.entries.insert(locator.into(), bytes.into());
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(mut self, locator: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(locator, bytes);
        self
    }

    /// Number of registered locators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ByteSource for MemorySource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        self.entries
            .get(locator)
            .map(|b| b.to_vec())
            .ok_or_else(|| FetchError::NotFound {
                locator: locator.to_owned(),
            })
    }
}

/// Normalize a root-relative locator: forward slashes, no `.` segments, no escaping the root.
pub fn normalize_locator(locator: &str) -> Result<String, FetchError> {
    let invalid = |reason| FetchError::InvalidLocator {
        locator: locator.to_owned(),
        reason,
    };

    let s = locator.replace('\\', "/");
    if s.starts_with('/') {
        return Err(invalid("locators must be relative"));
    }

    let mut parts = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(invalid("locators must not contain '..'"));
        }
        parts.push(part);
    }
    if parts.is_empty() {
        return Err(invalid("locator must contain a file name"));
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/load/source.rs"]
mod tests;
