//! Adjacent extension modules
//!
//! Native extension modules cannot be embedded in the image. They ship as
//! `<fqmn>.<native-suffix>` files next to the executable, or on macOS inside
//! the application bundle's `PlugIns` or `Frameworks` directory.

use std::path::{Path, PathBuf};

use crate::name::ModuleName;

/// Platform suffix of a native extension module (without the dot).
#[cfg(windows)]
pub const NATIVE_SUFFIX: &str = "pyd";

/// Platform suffix of a native extension module (without the dot).
#[cfg(not(windows))]
pub const NATIVE_SUFFIX: &str = "so";

/// Bundle sub-directories searched before the executable's own directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleLayout {
    /// Preferred location for dynamic modules, relative to the executable dir
    pub plugin_dir: Option<PathBuf>,
    /// Shared-library directory, relative to the executable dir
    pub library_dir: Option<PathBuf>,
}

impl BundleLayout {
    /// The layout of the platform this was compiled for.
    pub fn current_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                plugin_dir: Some(PathBuf::from("../PlugIns")),
                library_dir: Some(PathBuf::from("../Frameworks")),
            }
        } else {
            Self::default()
        }
    }
}

/// Locates adjacent extension modules on disk.
#[derive(Debug, Clone)]
pub struct ExtensionBridge {
    executable_dir: Option<PathBuf>,
    layout: BundleLayout,
    suffix: String,
}

impl ExtensionBridge {
    /// Create a bridge. With no executable directory the bridge never
    /// reports a hit.
    pub fn new(
        executable_dir: Option<PathBuf>,
        layout: BundleLayout,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            executable_dir,
            layout,
            suffix: suffix.into(),
        }
    }

    /// The directory adjacent extensions are searched relative to.
    pub fn executable_dir(&self) -> Option<&Path> {
        self.executable_dir.as_deref()
    }

    /// The native suffix in use.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Every file checked for `fqmn`, in priority order.
    pub fn candidates(&self, fqmn: &ModuleName) -> Vec<PathBuf> {
        let Some(exec_dir) = &self.executable_dir else {
            return Vec::new();
        };

        let file_name = format!("{}.{}", fqmn.as_str(), self.suffix);
        let mut candidates = Vec::with_capacity(3);
        if let Some(plugins) = &self.layout.plugin_dir {
            candidates.push(exec_dir.join(plugins).join(&file_name));
        }
        if let Some(libraries) = &self.layout.library_dir {
            candidates.push(exec_dir.join(libraries).join(&file_name));
        }
        candidates.push(exec_dir.join(&file_name));
        candidates
    }

    /// The first existing extension file for `fqmn`.
    pub fn locate(&self, fqmn: &ModuleName) -> Option<PathBuf> {
        self.candidates(fqmn).into_iter().find(|candidate| {
            log::trace!("checking extension {}", candidate.display());
            candidate.is_file()
        })
    }
}

/// Directory containing the running executable.
pub fn current_executable_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}
