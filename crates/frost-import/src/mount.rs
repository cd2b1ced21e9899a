//! Mounts: virtual-path prefixes bound to the shared image.

use std::sync::Arc;

use frost_vfs::{normalize_path, Vfs, VfsError};

/// One read-only prefix of the image, e.g. `/stdlib`.
#[derive(Debug, Clone)]
pub struct Mount {
    prefix: String,
    vfs: Arc<Vfs>,
}

impl Mount {
    /// Bind a prefix to the image.
    pub fn new(prefix: &str, vfs: Arc<Vfs>) -> Self {
        Self {
            prefix: normalize_path(prefix),
            vfs,
        }
    }

    /// The normalized prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `path` is the prefix itself or lies beneath it.
    pub fn contains(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if self.prefix == "/" {
            return true;
        }
        path == self.prefix
            || (path.starts_with(&self.prefix)
                && path.as_bytes().get(self.prefix.len()) == Some(&b'/'))
    }

    /// Directory segments of `path` below the prefix, e.g. `/stdlib/xml/dom`
    /// under `/stdlib` is `["xml", "dom"]`.
    pub fn relative_segments(&self, path: &str) -> Option<Vec<String>> {
        if !self.contains(path) {
            return None;
        }
        let path = normalize_path(path);
        let rest = if self.prefix == "/" {
            &path[1..]
        } else {
            &path[self.prefix.len()..]
        };
        Some(
            rest.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Whether the path is a file.
    pub fn is_file(&self, path: &str) -> bool {
        self.vfs.is_file(path)
    }

    /// Whether the path is a directory.
    pub fn is_dir(&self, path: &str) -> bool {
        self.vfs.is_dir(path)
    }

    /// Read a file's bytes.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.vfs.read(path)
    }

    /// The image this mount reads from.
    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }
}
