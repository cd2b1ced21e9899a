//! Virtual Filesystem (VFS)
//!
//! Read-only, hierarchical namespace of byte blobs:
//! - **Embedded**: data decoded from the image appended to the binary
//! - **DiskBacked**: reads from the real filesystem (dev mode, before an
//!   image has been built)
//!
//! Paths are absolute and slash-separated (`/stdlib/types.frz`). Only files
//! are stored; a directory exists exactly when some file lives beneath it.
//! The root `/` always exists.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::VfsError;

/// A single file entry in the virtual filesystem.
#[derive(Debug, Clone)]
pub enum VfsEntry {
    /// Dev mode: file lives on disk, read on demand.
    DiskBacked(PathBuf),

    /// Image mode: file data embedded in the binary.
    Embedded(Arc<[u8]>),
}

/// The virtual filesystem.
///
/// Immutable once constructed; every query is a lookup in prebuilt maps.
#[derive(Debug, Clone)]
pub struct Vfs {
    entries: HashMap<String, VfsEntry>,
    /// Directory path → names of its direct children (files and dirs)
    dirs: HashMap<String, BTreeSet<String>>,
}

impl Vfs {
    /// Create a VFS from a map of entries.
    pub fn new(entries: HashMap<String, VfsEntry>) -> Self {
        let entries: HashMap<String, VfsEntry> = entries
            .into_iter()
            .map(|(path, entry)| (normalize_path(&path), entry))
            .collect();

        let mut dirs: HashMap<String, BTreeSet<String>> = HashMap::new();
        dirs.insert("/".to_string(), BTreeSet::new());

        for path in entries.keys() {
            let mut child = path.as_str();
            while let Some((parent, name)) = split_parent(child) {
                let inserted = dirs
                    .entry(parent.to_string())
                    .or_default()
                    .insert(name.to_string());
                if !inserted {
                    break;
                }
                child = parent;
            }
        }

        Self { entries, dirs }
    }

    /// Create an empty VFS (only the root directory).
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Create a VFS of embedded files from (path, data) pairs.
    pub fn from_files<I>(files: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let entries = files
            .into_iter()
            .map(|(path, data)| (path, VfsEntry::Embedded(Arc::from(data))))
            .collect();
        Self::new(entries)
    }

    /// Create a disk-backed VFS mirroring a directory tree.
    ///
    /// `root/stdlib/types.frz` becomes `/stdlib/types.frz`.
    pub fn from_disk(root: &Path) -> io::Result<Self> {
        let mut files = Vec::new();
        collect_all_files(root, &mut files)?;

        let mut entries = HashMap::new();
        for path in files {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            entries.insert(format!("/{}", relative), VfsEntry::DiskBacked(path));
        }

        log::debug!("vfs: mapped {} files from {}", entries.len(), root.display());
        Ok(Self::new(entries))
    }

    /// Check if a file or directory exists at the path.
    pub fn exists(&self, path: &str) -> bool {
        let normalized = normalize_path(path);
        self.entries.contains_key(&normalized) || self.dirs.contains_key(&normalized)
    }

    /// Check if the path names a file.
    pub fn is_file(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    /// Check if the path names a directory.
    pub fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains_key(&normalize_path(path))
    }

    /// Read a whole file.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let normalized = normalize_path(path);
        match self.entries.get(&normalized) {
            Some(VfsEntry::Embedded(data)) => Ok(data.to_vec()),
            Some(VfsEntry::DiskBacked(p)) => std::fs::read(p).map_err(|source| VfsError::Io {
                path: normalized,
                source,
            }),
            None if self.dirs.contains_key(&normalized) => Err(VfsError::IsADirectory(normalized)),
            None => Err(VfsError::NotFound(normalized)),
        }
    }

    /// Read a file as UTF-8 text.
    pub fn read_text(&self, path: &str) -> Option<String> {
        let data = self.read(path).ok()?;
        String::from_utf8(data).ok()
    }

    /// Open a file for streaming reads.
    pub fn open(&self, path: &str) -> Result<VfsReader, VfsError> {
        let normalized = normalize_path(path);
        match self.entries.get(&normalized) {
            Some(VfsEntry::Embedded(data)) => Ok(VfsReader::Memory {
                data: Arc::clone(data),
                pos: 0,
            }),
            Some(VfsEntry::DiskBacked(p)) => File::open(p)
                .map(VfsReader::Disk)
                .map_err(|source| VfsError::Io {
                    path: normalized,
                    source,
                }),
            None if self.dirs.contains_key(&normalized) => Err(VfsError::IsADirectory(normalized)),
            None => Err(VfsError::NotFound(normalized)),
        }
    }

    /// Names of the direct children of a directory.
    pub fn list_dir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let normalized = normalize_path(path);
        match self.dirs.get(&normalized) {
            Some(children) => Ok(children.iter().cloned().collect()),
            None if self.entries.contains_key(&normalized) => Err(VfsError::NotFound(format!(
                "{} (not a directory)",
                normalized
            ))),
            None => Err(VfsError::NotFound(normalized)),
        }
    }

    /// List all file paths in the VFS.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Number of files in the VFS.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the VFS holds no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A forward-only reader over one VFS file.
#[derive(Debug)]
pub enum VfsReader {
    /// Embedded data with a read cursor.
    Memory {
        /// Shared file bytes
        data: Arc<[u8]>,
        /// Offset of the next unread byte
        pos: usize,
    },

    /// Dev-mode file opened on disk.
    Disk(File),
}

impl Read for VfsReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            VfsReader::Memory { data, pos } => {
                let remaining = &data[*pos..];
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                *pos += n;
                Ok(n)
            }
            VfsReader::Disk(file) => file.read(buf),
        }
    }
}

/// Normalize a path for VFS lookup.
///
/// - Replace backslashes with forward slashes
/// - Drop empty and `.` segments
/// - Always absolute, no trailing `/` (except the root itself)
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut out = String::with_capacity(unified.len() + 1);
    for segment in unified.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Join a directory path and a relative name.
pub fn join_path(dir: &str, name: &str) -> String {
    normalize_path(&format!("{}/{}", dir, name))
}

/// Split a normalized path into (parent, name). The root has no parent.
fn split_parent(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    let idx = path.rfind('/')?;
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, &path[idx + 1..]))
}

/// Recursively collect all files in a directory.
fn collect_all_files(dir: &Path, results: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_all_files(&path, results)?;
        } else {
            results.push(path);
        }
    }
    Ok(())
}
