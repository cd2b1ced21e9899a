//! `frost find`: classification of a module name along the search path.

use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use frost_import::{Classification, ImportConfig, ImportRegistry, ModuleName};

/// One search-path directory and what the name is there.
#[derive(Debug)]
pub struct Hit {
    pub dir: String,
    pub classification: Classification,
}

/// Classify `fqmn` in every frozen directory it could live in. Parent
/// packages are followed through their `__path__`.
pub fn resolve(registry: &Arc<ImportRegistry>, fqmn: &str) -> anyhow::Result<Vec<Hit>> {
    let name = ModuleName::parse(fqmn)?;
    let mut dirs = registry.search_path();

    let segments = name.parent_segments();
    for depth in 1..=segments.len() {
        let parent = segments[..depth].join(".");
        let mut portions = Vec::new();
        let mut package = None;

        for dir in &dirs {
            let Ok(finder) = registry.finder_for_path(dir) else {
                continue;
            };
            match finder.classify(&parent)? {
                Classification::Package { namespace_path, .. } => {
                    package = Some(namespace_path);
                    break;
                }
                Classification::Namespace { namespace_path } => portions.push(namespace_path),
                Classification::NotFound => {}
                _ => bail!("{} is not a package", parent),
            }
        }

        dirs = match package {
            Some(path) => vec![path],
            None if !portions.is_empty() => portions,
            None => bail!("parent package {} not found", parent),
        };
    }

    let mut hits = Vec::new();
    for dir in dirs {
        let Ok(finder) = registry.finder_for_path(&dir) else {
            continue;
        };
        let classification = finder.classify(fqmn)?;
        hits.push(Hit {
            dir: finder.path().to_string(),
            classification,
        });
    }
    Ok(hits)
}

pub fn execute(image: &Path, config: ImportConfig, fqmn: &str) -> anyhow::Result<()> {
    let registry = super::open_registry(image, config)?;
    let hits = resolve(&registry, fqmn)?;

    let mut found = false;
    for hit in &hits {
        let detail = match &hit.classification {
            Classification::Module { code_path } => code_path.clone(),
            Classification::Package {
                code_path,
                namespace_path,
            } => format!("{} (__path__ = [{:?}])", code_path, namespace_path),
            Classification::Namespace { namespace_path } => namespace_path.clone(),
            Classification::AdjacentExtension { path } => path.display().to_string(),
            Classification::NotFound => String::new(),
        };
        found |= hit.classification != Classification::NotFound;
        println!("{:<24} {:<20} {}", hit.dir, hit.classification.module_type(), detail);
    }

    if !found {
        bail!("can't find module {}", fqmn);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_import::{BundleLayout, ExtensionBridge, ModuleType};
    use frost_vfs::Vfs;

    fn registry(files: &[&str]) -> Arc<ImportRegistry> {
        let vfs = Vfs::from_files(files.iter().map(|p| (p.to_string(), Vec::new())));
        let extensions = ExtensionBridge::new(None, BundleLayout::default(), "so");
        Arc::new(
            ImportRegistry::with_extension_bridge(vfs, ImportConfig::default(), extensions)
                .unwrap(),
        )
    }

    fn types(hits: &[Hit]) -> Vec<(&str, ModuleType)> {
        hits.iter()
            .map(|hit| (hit.dir.as_str(), hit.classification.module_type()))
            .collect()
    }

    #[test]
    fn test_top_level_along_search_path() {
        let registry = registry(&["/stdlib/types.frz", "/site-packages/six.frz"]);
        let hits = resolve(&registry, "types").unwrap();
        assert_eq!(
            types(&hits),
            vec![
                ("/", ModuleType::NotFound),
                ("/stdlib", ModuleType::Module),
                ("/site-packages", ModuleType::NotFound),
            ]
        );
    }

    #[test]
    fn test_follows_package_path() {
        let registry = registry(&[
            "/stdlib/xml/__init__.frz",
            "/stdlib/xml/dom/__init__.frz",
            "/stdlib/xml/dom/minidom.frz",
        ]);
        let hits = resolve(&registry, "xml.dom.minidom").unwrap();
        assert_eq!(types(&hits), vec![("/stdlib/xml/dom", ModuleType::Module)]);
    }

    #[test]
    fn test_follows_namespace_portions() {
        let registry = registry(&["/nsp/a.frz", "/site-packages/nsp/b.frz"]);
        let hits = resolve(&registry, "nsp.b").unwrap();
        assert_eq!(
            types(&hits),
            vec![
                ("/nsp", ModuleType::NotFound),
                ("/site-packages/nsp", ModuleType::Module),
            ]
        );
    }

    #[test]
    fn test_missing_or_plain_parent() {
        let registry = registry(&["/stdlib/types.frz"]);
        assert!(resolve(&registry, "nope.child").is_err());
        assert!(resolve(&registry, "types.child").is_err());
    }
}
