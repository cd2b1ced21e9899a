//! Frost VFS
//!
//! Read-only virtual filesystem baked into an application binary:
//! - **format**: binary image layout (record section + trailer) and builder
//! - **image**: self-detection of an image appended to the executable
//! - **vfs**: path-addressed lookup (Embedded for images, DiskBacked for dev)

pub mod error;
pub mod format;
pub mod image;
pub mod vfs;

pub use error::{ImageError, VfsError};
pub use format::{ImageBuilder, ImageTrailer, TRAILER_MAGIC, TRAILER_SIZE};
pub use image::{detect_image, detect_image_at, read_image};
pub use vfs::{join_path, normalize_path, Vfs, VfsEntry, VfsReader};
