//! Subcommand implementations and the helpers they share.

pub mod cat;
pub mod find;
pub mod info;
pub mod ls;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use frost_import::{ImportConfig, ImportRegistry};
use frost_vfs::Vfs;

/// Load `--config`, or the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ImportConfig> {
    match path {
        Some(path) => ImportConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ImportConfig::default()),
    }
}

/// Open an image: a directory is mapped as-is, a file must carry an
/// appended image.
pub fn open_image(path: &Path) -> anyhow::Result<Vfs> {
    if path.is_dir() {
        return Vfs::from_disk(path).with_context(|| format!("failed to read {}", path.display()));
    }
    let image = frost_vfs::detect_image_at(path)
        .with_context(|| format!("bad image in {}", path.display()))?;
    match image {
        Some(vfs) => Ok(vfs),
        None => bail!("no frost image found in {}", path.display()),
    }
}

/// Build the registry for an image.
pub fn open_registry(path: &Path, config: ImportConfig) -> anyhow::Result<Arc<ImportRegistry>> {
    let vfs = open_image(path)?;
    let registry = ImportRegistry::new(vfs, config).context("invalid importer configuration")?;
    Ok(Arc::new(registry))
}
