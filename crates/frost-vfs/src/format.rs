//! Binary image format
//!
//! Defines the structure of the VFS image appended to an application binary.
//!
//! ```text
//! ┌─────────────────────────┐
//! │  application (unchanged)│  ← normal executable
//! ├─────────────────────────┤
//! │  VFS Section            │  ← [header][path][data] per file
//! ├─────────────────────────┤
//! │  Trailer                │  ← fixed-size, at very end of file
//! └─────────────────────────┘
//! ```
//!
//! A bare image (no executable in front) is the same layout with a
//! `payload_offset` of zero.

use std::io::{self, Write};

use crate::error::ImageError;

/// Magic bytes identifying an image trailer.
pub const TRAILER_MAGIC: [u8; 8] = *b"FROSTIMG";

/// Current image layout version.
pub const IMAGE_VERSION: u32 = 1;

/// Size of the image trailer in bytes.
pub const TRAILER_SIZE: usize = std::mem::size_of::<ImageTrailer>();

/// Size of a record header in bytes.
pub const RECORD_HEADER_SIZE: usize = std::mem::size_of::<RecordHeader>();

/// Fixed-size trailer at the very end of an image.
///
/// To detect if a binary carries an image, read the last `TRAILER_SIZE`
/// bytes and check the magic.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct ImageTrailer {
    /// Magic bytes: b"FROSTIMG"
    pub magic: [u8; 8],

    /// Layout version of the section.
    pub version: u32,

    /// Where the record section starts, relative to the payload.
    pub vfs_offset: u64,

    /// Record section length.
    pub vfs_size: u64,

    /// Number of file records in the section.
    pub entry_count: u32,

    /// CRC32 checksum of the entire payload.
    pub checksum: u32,

    /// `TRAILER_SIZE` at write time; readers reject anything else.
    pub trailer_size: u32,

    /// Length of whatever precedes the payload (the executable).
    pub payload_offset: u64,
}

/// Header of one file record in the VFS section.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    /// Path length in bytes.
    pub path_len: u32,

    /// Data length in bytes.
    pub data_size: u64,
}

impl ImageTrailer {
    /// Whether the magic matches.
    pub fn is_valid(&self) -> bool {
        self.magic == TRAILER_MAGIC
    }

    /// Read a trailer from raw bytes (at least TRAILER_SIZE bytes).
    ///
    /// Returns `None` when the magic does not match.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < TRAILER_SIZE {
            return None;
        }

        // Safety: ImageTrailer is repr(C, packed) plain data with no padding
        let trailer = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const ImageTrailer) };

        if trailer.is_valid() {
            Some(trailer)
        } else {
            None
        }
    }

    /// Serialize the trailer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; TRAILER_SIZE];
        unsafe {
            std::ptr::write_unaligned(bytes.as_mut_ptr() as *mut ImageTrailer, *self);
        }
        bytes
    }

    /// Serialize the trailer into `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

impl RecordHeader {
    fn to_bytes(self) -> Vec<u8> {
        let mut bytes = vec![0u8; RECORD_HEADER_SIZE];
        unsafe {
            std::ptr::write_unaligned(bytes.as_mut_ptr() as *mut RecordHeader, self);
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() >= RECORD_HEADER_SIZE);
        unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const RecordHeader) }
    }
}

/// Emit one `[RecordHeader][path][data]` record per file and return the
/// number of bytes written.
pub fn write_vfs_section<W: Write>(writer: &mut W, files: &[(String, Vec<u8>)]) -> io::Result<u64> {
    let mut total = 0u64;

    for (path, data) in files {
        let header = RecordHeader {
            path_len: path.len() as u32,
            data_size: data.len() as u64,
        };
        let header_bytes = header.to_bytes();

        writer.write_all(&header_bytes)?;
        writer.write_all(path.as_bytes())?;
        writer.write_all(data)?;

        total += header_bytes.len() as u64 + path.len() as u64 + data.len() as u64;
    }

    Ok(total)
}

/// Parse a record section.
///
/// Unlike a best-effort scan, any record that runs past the end of the
/// section or carries a non-UTF-8 path fails the whole section.
pub fn read_vfs_section(data: &[u8]) -> Result<Vec<(String, Vec<u8>)>, ImageError> {
    let mut result = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        if offset + RECORD_HEADER_SIZE > data.len() {
            return Err(ImageError::BadRecord {
                offset,
                reason: "truncated record header".to_string(),
            });
        }
        let header = RecordHeader::from_bytes(&data[offset..]);
        let record_start = offset;
        offset += RECORD_HEADER_SIZE;

        let path_len = header.path_len as usize;
        let data_size = header.data_size;
        let remaining = data.len() - offset;

        let record_end = usize::try_from(data_size)
            .ok()
            .and_then(|size| size.checked_add(path_len))
            .and_then(|len| offset.checked_add(len))
            .filter(|&end| end <= data.len());
        let Some(record_end) = record_end else {
            return Err(ImageError::BadRecord {
                offset: record_start,
                reason: format!(
                    "record of {} + {} bytes overruns section of {} bytes",
                    path_len, data_size, remaining
                ),
            });
        };
        let data_size = record_end - offset - path_len;

        let path = std::str::from_utf8(&data[offset..offset + path_len])
            .map_err(|e| ImageError::BadRecord {
                offset: record_start,
                reason: format!("path is not UTF-8: {}", e),
            })?
            .to_string();
        offset += path_len;

        let file_data = data[offset..offset + data_size].to_vec();
        offset += data_size;

        result.push((path, file_data));
    }

    Ok(result)
}

/// Collects files and produces an image payload with its trailer.
#[derive(Debug, Default, Clone)]
pub struct ImageBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl ImageBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at an absolute virtual path.
    pub fn add_file(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.files.push((path.into(), data.into()));
        self
    }

    /// Number of files collected so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no files have been added.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Build a bare image: section followed by trailer.
    pub fn build(&self) -> Vec<u8> {
        self.build_at(0)
    }

    /// Append the image to an executable's bytes.
    pub fn append_to(&self, executable: &[u8]) -> Vec<u8> {
        let mut out = executable.to_vec();
        out.extend_from_slice(&self.build_at(executable.len() as u64));
        out
    }

    fn build_at(&self, payload_offset: u64) -> Vec<u8> {
        let mut files = self.files.clone();
        files.sort_by(|a, b| a.0.cmp(&b.0)); // deterministic order

        let mut payload = Vec::new();
        // Writing into a Vec cannot fail
        let vfs_size = write_vfs_section(&mut payload, &files).unwrap_or(0);

        let trailer = ImageTrailer {
            magic: TRAILER_MAGIC,
            version: IMAGE_VERSION,
            vfs_offset: 0,
            vfs_size,
            entry_count: files.len() as u32,
            checksum: crc32fast::hash(&payload),
            trailer_size: TRAILER_SIZE as u32,
            payload_offset,
        };

        payload.extend_from_slice(&trailer.to_bytes());
        payload
    }
}
