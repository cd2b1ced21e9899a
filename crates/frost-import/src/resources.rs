//! Package resources.
//!
//! Data files stored beside a package's code can be listed and streamed.
//! They live in the image, so they never have a real file-system path.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use frost_vfs::{join_path, Vfs, VfsError, VfsReader};

use crate::error::ResourceError;

/// Reader bound to one package directory.
#[derive(Debug, Clone)]
pub struct ResourceReader {
    vfs: Arc<Vfs>,
    package: String,
    pathname: String,
}

impl ResourceReader {
    pub(crate) fn new(vfs: Arc<Vfs>, package: &str, pathname: &str) -> Self {
        Self {
            vfs,
            package: package.to_string(),
            pathname: pathname.to_string(),
        }
    }

    /// The package this reader belongs to.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The package directory in the image.
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Names of every entry in the package directory, sorted.
    pub fn contents(&self) -> Result<Vec<String>, ResourceError> {
        Ok(self.vfs.list_dir(&self.pathname)?)
    }

    /// Whether `name` is a file. Directories are not resources.
    pub fn is_resource(&self, name: &str) -> Result<bool, ResourceError> {
        let path = self.resource_vpath(name);
        if !self.vfs.exists(&path) {
            return Err(ResourceError::NotFound(name.to_string()));
        }
        Ok(self.vfs.is_file(&path))
    }

    /// Open `name` for reading.
    pub fn open_resource(&self, name: &str) -> Result<ResourceStream, ResourceError> {
        let path = self.resource_vpath(name);
        let reader = self.vfs.open(&path).map_err(|e| match e {
            VfsError::NotFound(_) => ResourceError::NotFound(name.to_string()),
            other => ResourceError::Storage(other),
        })?;
        Ok(ResourceStream {
            path,
            reader: Some(reader),
        })
    }

    /// Always fails: resources are not on the file system.
    pub fn resource_path(&self, name: &str) -> Result<PathBuf, ResourceError> {
        Err(ResourceError::NotOnFileSystem(name.to_string()))
    }

    fn resource_vpath(&self, name: &str) -> String {
        join_path(&self.pathname, name)
    }
}

/// A forward-only read stream over one resource.
#[derive(Debug)]
pub struct ResourceStream {
    path: String,
    reader: Option<VfsReader>,
}

impl ResourceStream {
    /// Read up to `size` bytes, or everything left when `size` is `None`.
    pub fn read(&mut self, size: Option<usize>) -> Result<Vec<u8>, ResourceError> {
        let path = self.path.clone();
        let reader = self.reader.as_mut().ok_or_else(|| ResourceError::Closed(path.clone()))?;
        let mut data = Vec::new();
        let result = match size {
            Some(limit) => reader.take(limit as u64).read_to_end(&mut data),
            None => reader.read_to_end(&mut data),
        };
        result.map_err(|source| ResourceError::Storage(VfsError::Io { path, source }))?;
        Ok(data)
    }

    /// Read everything left.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>, ResourceError> {
        self.read(None)
    }

    /// Release the underlying data. Closing twice is harmless.
    pub fn close(&mut self) {
        self.reader = None;
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Always true.
    pub fn readable(&self) -> bool {
        true
    }

    /// Always false.
    pub fn seekable(&self) -> bool {
        false
    }

    /// Always false.
    pub fn writable(&self) -> bool {
        false
    }

    /// Nothing to flush.
    pub fn flush(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }
}

impl Read for ResourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                ResourceError::Closed(self.path.clone()),
            )),
        }
    }
}
