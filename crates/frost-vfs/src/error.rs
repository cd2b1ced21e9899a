//! VFS error types.

use std::path::PathBuf;

/// Errors reading from the virtual filesystem.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// No file or directory at this path
    #[error("{0}: no such file or directory")]
    NotFound(String),

    /// The path names a directory, not a file
    #[error("{0}: is a directory")]
    IsADirectory(String),

    /// The disk file backing a dev-mode entry could not be read
    #[error("{path}: {source}")]
    Io {
        /// Virtual path that was being read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl VfsError {
    /// The virtual path this error concerns.
    pub fn path(&self) -> &str {
        match self {
            VfsError::NotFound(path) | VfsError::IsADirectory(path) => path,
            VfsError::Io { path, .. } => path,
        }
    }
}

/// Errors decoding an image appended to a binary.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The binary could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being inspected
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Trailer written by an incompatible builder
    #[error("Unsupported image version: {0}")]
    UnsupportedVersion(u32),

    /// Offsets in the trailer point outside the file
    #[error("Image truncated: {0}")]
    Truncated(String),

    /// Payload bytes do not match the trailer checksum
    #[error("Image checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Checksum recorded in the trailer
        expected: u32,
        /// Checksum computed over the payload
        actual: u32,
    },

    /// A record in the section is malformed
    #[error("Malformed image record at offset {offset}: {reason}")]
    BadRecord {
        /// Byte offset of the record within the section
        offset: usize,
        /// What was wrong with it
        reason: String,
    },
}
