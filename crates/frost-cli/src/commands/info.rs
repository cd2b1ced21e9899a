//! `frost info`: image and search-path summary.

use std::path::Path;

use frost_import::ImportConfig;

pub fn execute(image: &Path, config: ImportConfig) -> anyhow::Result<()> {
    let registry = super::open_registry(image, config)?;

    println!("Image:        {}", image.display());
    println!("Entries:      {}", registry.vfs().len());
    println!("Code suffix:  .{}", registry.compiled_suffix());
    println!("Native:       .{}", registry.extensions().suffix());
    match registry.extensions().executable_dir() {
        Some(dir) => println!("Exec dir:     {}", dir.display()),
        None => println!("Exec dir:     (unknown)"),
    }

    println!();
    println!("Mounts:");
    for mount in registry.mounts() {
        println!("  {}", mount.prefix());
    }

    println!();
    println!("Search path:");
    for entry in registry.search_path() {
        println!("  {}", entry);
    }

    Ok(())
}
