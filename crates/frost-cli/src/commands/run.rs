//! `frost run`: import a module in the sandbox host.

use std::path::Path;

use frost_import::{ImportConfig, Sandbox};

pub fn execute(image: &Path, config: ImportConfig, fqmn: &str) -> anyhow::Result<()> {
    let registry = super::open_registry(image, config)?;
    let sandbox = Sandbox::new(registry);

    let module = sandbox.import(fqmn)?;

    println!("<module '{}'>", module.name());
    if let Some(file) = module.file() {
        println!("  __file__ = {:?}", file);
    }
    if let Some(path) = module.path() {
        println!("  __path__ = {:?}", path);
    }
    for (name, value) in module.attributes() {
        println!("  {} = {}", name, value);
    }

    log::debug!("modules loaded: {}", sandbox.module_names().join(", "));
    Ok(())
}
