//! Image loader
//!
//! Detects a VFS image appended to the current executable and loads it:
//! 1. Read trailer from end of binary
//! 2. Validate magic, version, bounds and checksum
//! 3. Parse the VFS section into embedded entries

use std::fs;
use std::path::Path;

use crate::error::ImageError;
use crate::format::{read_vfs_section, ImageTrailer, IMAGE_VERSION, TRAILER_SIZE};
use crate::vfs::Vfs;

/// Detect an image appended to the running executable.
///
/// `Ok(None)` means the executable simply carries no image.
pub fn detect_image() -> Result<Option<Vfs>, ImageError> {
    let exe_path = std::env::current_exe().map_err(|source| ImageError::Io {
        path: "<current executable>".into(),
        source,
    })?;
    detect_image_at(&exe_path)
}

/// Detect an image in the given file (an executable or a bare image).
pub fn detect_image_at(path: &Path) -> Result<Option<Vfs>, ImageError> {
    let data = fs::read(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_image(&data)
}

/// Decode an image from the full bytes of a file.
pub fn read_image(data: &[u8]) -> Result<Option<Vfs>, ImageError> {
    if data.len() < TRAILER_SIZE {
        return Ok(None);
    }

    // Read trailer from the end
    let trailer = match ImageTrailer::from_bytes(&data[data.len() - TRAILER_SIZE..]) {
        Some(trailer) => trailer,
        None => return Ok(None),
    };

    let version = trailer.version;
    if version != IMAGE_VERSION {
        return Err(ImageError::UnsupportedVersion(version));
    }
    let trailer_size = trailer.trailer_size as usize;
    if trailer_size != TRAILER_SIZE {
        return Err(ImageError::Truncated(format!(
            "trailer declares {} bytes, expected {}",
            trailer_size, TRAILER_SIZE
        )));
    }

    // Validate checksum
    let payload_end = data.len() - TRAILER_SIZE;
    let payload_start = usize::try_from(trailer.payload_offset)
        .ok()
        .filter(|&start| start <= payload_end);
    let Some(payload_start) = payload_start else {
        let payload_offset = trailer.payload_offset;
        return Err(ImageError::Truncated(format!(
            "payload offset {} beyond end of data at {}",
            payload_offset, payload_end
        )));
    };

    let payload = &data[payload_start..payload_end];
    let computed = crc32fast::hash(payload);
    let expected = trailer.checksum;
    if computed != expected {
        return Err(ImageError::ChecksumMismatch {
            expected,
            actual: computed,
        });
    }

    // The trailer itself is not checksummed; bound the section before slicing
    let vfs_offset = trailer.vfs_offset;
    let vfs_size = trailer.vfs_size;
    let section = usize::try_from(vfs_offset)
        .ok()
        .zip(usize::try_from(vfs_size).ok())
        .and_then(|(start, size)| Some((start, start.checked_add(size)?)))
        .filter(|&(_, end)| end <= payload.len());
    let Some((vfs_start, vfs_end)) = section else {
        return Err(ImageError::Truncated(format!(
            "section at {} of {} bytes exceeds payload of {} bytes",
            vfs_offset,
            vfs_size,
            payload.len()
        )));
    };

    // Parse VFS section
    let files = read_vfs_section(&payload[vfs_start..vfs_end])?;
    let entry_count = trailer.entry_count as usize;
    if files.len() != entry_count {
        return Err(ImageError::Truncated(format!(
            "trailer records {} entries, section holds {}",
            entry_count,
            files.len()
        )));
    }

    log::debug!("image: {} entries in {} bytes", files.len(), payload.len());
    Ok(Some(Vfs::from_files(files)))
}
