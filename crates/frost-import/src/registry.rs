//! The process-wide import registry.
//!
//! Built once at startup from the image and the configuration, then shared
//! by every importer through an `Arc`. Apart from the fallback guard it is
//! immutable.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use frost_vfs::{normalize_path, Vfs};

use crate::config::{ConfigError, ImportConfig};
use crate::error::ImportError;
use crate::extension::{current_executable_dir, BundleLayout, ExtensionBridge, NATIVE_SUFFIX};
use crate::importer::FrozenImporter;
use crate::mount::Mount;

/// Shared state of the import subsystem.
#[derive(Debug)]
pub struct ImportRegistry {
    vfs: Arc<Vfs>,
    config: ImportConfig,
    mounts: Vec<Mount>,
    extensions: ExtensionBridge,
    /// Threads currently delegating to the host's default finder chain
    fallback_threads: Mutex<HashSet<ThreadId>>,
}

impl ImportRegistry {
    /// Create a registry, locating adjacent extensions relative to the
    /// configured or the running executable's directory.
    pub fn new(vfs: Vfs, config: ImportConfig) -> Result<Self, ConfigError> {
        let executable_dir = config.executable_dir.clone().or_else(current_executable_dir);
        let suffix = config
            .native_suffix
            .clone()
            .unwrap_or_else(|| NATIVE_SUFFIX.to_string());
        let extensions =
            ExtensionBridge::new(executable_dir, BundleLayout::current_platform(), suffix);
        Self::with_extension_bridge(vfs, config, extensions)
    }

    /// Create a registry with an explicit extension bridge.
    pub fn with_extension_bridge(
        vfs: Vfs,
        config: ImportConfig,
        extensions: ExtensionBridge,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let vfs = Arc::new(vfs);

        let mut mounts = Vec::with_capacity(config.mounts.len());
        for prefix in &config.mounts {
            if !vfs.is_dir(prefix) {
                log::warn!("mount {} is not a directory in the image, skipping", prefix);
                continue;
            }
            mounts.push(Mount::new(prefix, Arc::clone(&vfs)));
        }

        log::debug!(
            "import registry: {} mounts, {} files, extensions from {:?}",
            mounts.len(),
            vfs.len(),
            extensions.executable_dir()
        );

        Ok(Self {
            vfs,
            config,
            mounts,
            extensions,
            fallback_threads: Mutex::new(HashSet::new()),
        })
    }

    /// The shared image.
    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    /// The configuration the registry was built from.
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Mounts in search-path order.
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// The adjacent extension bridge.
    pub fn extensions(&self) -> &ExtensionBridge {
        &self.extensions
    }

    /// Suffix of frozen code blobs.
    pub fn compiled_suffix(&self) -> &str {
        &self.config.compiled_suffix
    }

    /// Initial module search path: the mount prefixes, then the configured
    /// on-disk directories.
    pub fn search_path(&self) -> Vec<String> {
        let mut path: Vec<String> = self.mounts.iter().map(|m| m.prefix().to_string()).collect();
        path.extend(
            self.config
                .expanded_path_dirs(self.extensions.executable_dir())
                .into_iter()
                .map(|dir: PathBuf| dir.to_string_lossy().into_owned()),
        );
        path
    }

    /// The mount with the longest prefix containing `path`.
    pub fn mount_for(&self, path: &str) -> Option<&Mount> {
        self.mounts
            .iter()
            .filter(|mount| mount.contains(path))
            .max_by_key(|mount| mount.prefix().len())
    }

    /// The path hook: an importer for a directory inside a mount.
    pub fn finder_for_path(self: &Arc<Self>, path: &str) -> Result<FrozenImporter, ImportError> {
        let normalized = normalize_path(path);
        let mount = self
            .mount_for(&normalized)
            .filter(|mount| mount.is_dir(&normalized))
            .ok_or_else(|| ImportError::NotFrozenPath(path.to_string()))?;
        let parent_segments = mount.relative_segments(&normalized).unwrap_or_default();

        Ok(FrozenImporter::new(
            Arc::clone(self),
            mount.clone(),
            normalized,
            parent_segments,
        ))
    }

    /// Claim the fallback slot for the calling thread. `None` while this
    /// thread is already delegating; other threads are unaffected.
    pub(crate) fn enter_fallback(&self) -> Option<FallbackGuard<'_>> {
        let thread = thread::current().id();
        if !self.fallback_threads.lock().insert(thread) {
            return None;
        }
        Some(FallbackGuard {
            threads: &self.fallback_threads,
            thread,
        })
    }

    /// Whether the calling thread is inside a fallback delegation.
    pub fn fallback_active(&self) -> bool {
        self.fallback_threads
            .lock()
            .contains(&thread::current().id())
    }
}

/// Releases the calling thread's fallback slot when dropped, including on
/// unwind.
pub(crate) struct FallbackGuard<'a> {
    threads: &'a Mutex<HashSet<ThreadId>>,
    thread: ThreadId,
}

impl Drop for FallbackGuard<'_> {
    fn drop(&mut self) {
        self.threads.lock().remove(&self.thread);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<ImportRegistry> {
        let vfs = Vfs::from_files(vec![
            ("/app.frz".to_string(), vec![]),
            ("/stdlib/xml/__init__.frz".to_string(), vec![]),
        ]);
        let extensions = ExtensionBridge::new(None, BundleLayout::default(), "so");
        Arc::new(
            ImportRegistry::with_extension_bridge(vfs, ImportConfig::default(), extensions)
                .unwrap(),
        )
    }

    #[test]
    fn test_missing_mounts_are_skipped() {
        let registry = registry();
        let prefixes: Vec<&str> = registry.mounts().iter().map(|m| m.prefix()).collect();
        assert_eq!(prefixes, vec!["/", "/stdlib"]);
        assert_eq!(registry.search_path(), vec!["/", "/stdlib"]);
    }

    #[test]
    fn test_mount_for_prefers_longest_prefix() {
        let registry = registry();
        assert_eq!(registry.mount_for("/stdlib/xml").unwrap().prefix(), "/stdlib");
        assert_eq!(registry.mount_for("/other").unwrap().prefix(), "/");
    }

    #[test]
    fn test_finder_for_path_records_parent_segments() {
        let registry = registry();

        let top = registry.finder_for_path("/stdlib").unwrap();
        assert!(top.parent_segments().is_empty());

        let xml = registry.finder_for_path("/stdlib/xml/").unwrap();
        assert_eq!(xml.path(), "/stdlib/xml");
        assert_eq!(xml.parent_segments(), ["xml".to_string()]);
    }

    #[test]
    fn test_finder_for_path_rejects_non_directories() {
        let registry = registry();
        assert!(matches!(
            registry.finder_for_path("/opt/app/lib"),
            Err(ImportError::NotFrozenPath(_))
        ));
        assert!(registry.finder_for_path("/app.frz").is_err());
    }

    #[test]
    fn test_fallback_guard_is_exclusive_and_released() {
        let registry = registry();
        {
            let guard = registry.enter_fallback();
            assert!(guard.is_some());
            assert!(registry.fallback_active());
            assert!(registry.enter_fallback().is_none());
        }
        assert!(!registry.fallback_active());
        assert!(registry.enter_fallback().is_some());
    }

    #[test]
    fn test_fallback_guard_is_per_thread() {
        let registry = registry();
        let _guard = registry.enter_fallback().unwrap();

        let other = Arc::clone(&registry);
        let claimed = std::thread::spawn(move || {
            let guard = other.enter_fallback();
            (guard.is_some(), other.fallback_active())
        })
        .join()
        .unwrap();

        assert_eq!(claimed, (true, true));
        assert!(registry.fallback_active());
    }

    #[test]
    fn test_search_path_appends_disk_dirs() {
        let vfs = Vfs::from_files(vec![("/main.frz".to_string(), vec![])]);
        let config = ImportConfig {
            mounts: vec!["/".to_string()],
            path_dirs: vec!["lib".to_string()],
            ..ImportConfig::default()
        };
        let extensions =
            ExtensionBridge::new(Some(PathBuf::from("/opt/app")), BundleLayout::default(), "so");
        let registry = ImportRegistry::with_extension_bridge(vfs, config, extensions).unwrap();

        let expected_lib = PathBuf::from("/opt/app").join("lib").to_string_lossy().into_owned();
        assert_eq!(registry.search_path(), vec!["/".to_string(), expected_lib]);
    }
}
