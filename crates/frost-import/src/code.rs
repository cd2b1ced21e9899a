//! Frozen code frames and the code deserializer.
//!
//! A stored code blob is the host runtime's marshalled code object wrapped
//! in a small frame:
//!
//! ```text
//! magic "FRZC" | version u32 | crc32 u32 | payload_len u64 | payload
//! ```
//!
//! All integers are little-endian. The frame is the only validation done
//! here; the payload itself is handed to the host untouched.

use crate::host::HostRuntime;

/// Magic number for frozen code blobs: "FRZC"
pub const CODE_MAGIC: [u8; 4] = *b"FRZC";

/// Current frame version
pub const CODE_VERSION: u32 = 1;

/// Size of the frame header in bytes
pub const CODE_HEADER_SIZE: usize = 20;

/// Errors decoding a code blob.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    /// Blob shorter than the frame header
    #[error("blob of {0} bytes is shorter than the code header")]
    TooShort(usize),

    /// Invalid magic number
    #[error("Invalid magic number: expected FRZC, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {CODE_VERSION})")]
    UnsupportedVersion(u32),

    /// Declared payload length disagrees with the blob
    #[error("payload length {declared} does not match the {actual} bytes present")]
    LengthMismatch {
        /// Length recorded in the header
        declared: u64,
        /// Bytes actually following the header
        actual: u64,
    },

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Expected checksum value
        expected: u32,
        /// Actual checksum value
        actual: u32,
    },

    /// The host could not turn the payload into a code object
    #[error("unmarshal failed: {0}")]
    Unmarshal(String),
}

/// Wrap a marshalled payload in a code frame.
pub fn freeze(payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(CODE_HEADER_SIZE + payload.len());
    blob.extend_from_slice(&CODE_MAGIC);
    blob.extend_from_slice(&CODE_VERSION.to_le_bytes());
    blob.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    blob.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    blob.extend_from_slice(payload);
    blob
}

/// Validate a code frame and return its payload.
pub fn unframe(blob: &[u8]) -> Result<&[u8], DeserializeError> {
    if blob.len() < CODE_HEADER_SIZE {
        return Err(DeserializeError::TooShort(blob.len()));
    }

    let magic = [blob[0], blob[1], blob[2], blob[3]];
    if magic != CODE_MAGIC {
        return Err(DeserializeError::InvalidMagic(magic));
    }

    let version = u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]);
    if version != CODE_VERSION {
        return Err(DeserializeError::UnsupportedVersion(version));
    }

    let stored_crc32 = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&blob[12..20]);
    let declared = u64::from_le_bytes(len_bytes);

    let payload = &blob[CODE_HEADER_SIZE..];
    if declared != payload.len() as u64 {
        return Err(DeserializeError::LengthMismatch {
            declared,
            actual: payload.len() as u64,
        });
    }

    let calculated = crc32fast::hash(payload);
    if calculated != stored_crc32 {
        return Err(DeserializeError::ChecksumMismatch {
            expected: stored_crc32,
            actual: calculated,
        });
    }

    Ok(payload)
}

/// Turn a stored blob into a host code object.
///
/// Pure: no module is created and nothing is executed.
pub fn deserialize<H: HostRuntime>(host: &H, blob: &[u8]) -> Result<H::Code, DeserializeError> {
    let payload = unframe(blob)?;
    host.unmarshal_code(payload).map_err(DeserializeError::Unmarshal)
}
