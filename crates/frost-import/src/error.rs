//! Import error types.
//!
//! Errors raised by the module's own top-level code never appear here: they
//! belong to the host runtime and reach the caller as the host's error type.

use frost_vfs::VfsError;

use crate::code::DeserializeError;

/// Errors that can occur while finding or loading a frozen module.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Name not resolved by this importer nor by the fallback chain
    #[error("can't find module {0}")]
    NotFound(String),

    /// Name is empty or has an empty segment
    #[error("invalid module name {0:?}")]
    InvalidName(String),

    /// The image could not be read; the image is expected to be intact
    #[error("error reading {path} for module {fqmn}: {source}")]
    Storage {
        /// Module being loaded (or the requested path for raw reads)
        fqmn: String,
        /// Virtual path that failed
        path: String,
        /// Underlying VFS error
        #[source]
        source: VfsError,
    },

    /// The stored blob is not a valid code object
    #[error("bad code object for module {fqmn} in {path}: {source}")]
    Deserialize {
        /// Module being loaded
        fqmn: String,
        /// Virtual path of the blob
        path: String,
        /// What was wrong with the blob
        #[source]
        source: DeserializeError,
    },

    /// A resource reader was requested for something that is not a package
    #[error("{0} is not a package")]
    NotAPackage(String),

    /// A path hook was offered a path outside every mount
    #[error("not a frozen path: {0}")]
    NotFrozenPath(String),
}

impl ImportError {
    /// Whether this is the plain "module absent" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ImportError::NotFound(_))
    }
}

/// Errors from the resource reader.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// No file or directory with this name in the package
    #[error("{0:?} does not exist")]
    NotFound(String),

    /// Resources live in the image, so no real path can be given
    #[error("{0:?} is not on the file system")]
    NotOnFileSystem(String),

    /// The stream was used after `close()`
    #[error("I/O operation on closed resource {0:?}")]
    Closed(String),

    /// Reading the backing data failed
    #[error(transparent)]
    Storage(#[from] VfsError),
}

impl ResourceError {
    /// Whether this is a not-found kind. A resource that exists only in
    /// the image has no file-system path, which counts as not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound(_) | ResourceError::NotOnFileSystem(_))
    }
}
