//! The frozen importer: finder, loader and resource loader for one
//! directory of the image.

use std::sync::Arc;

use crate::classify::{classify, Classification};
use crate::code::deserialize;
use crate::error::ImportError;
use crate::host::HostRuntime;
use crate::mount::Mount;
use crate::name::ModuleName;
use crate::protocol::{FindResult, Finder, Loader, ResourceLoader};
use crate::registry::ImportRegistry;
use crate::resources::ResourceReader;

/// Importer bound to one search-path directory inside a mount.
///
/// Created by [`ImportRegistry::finder_for_path`]. Cheap to clone: module
/// objects keep a clone as their `__loader__`.
#[derive(Debug, Clone)]
pub struct FrozenImporter {
    registry: Arc<ImportRegistry>,
    mount: Mount,
    path: String,
    parent_segments: Vec<String>,
}

impl FrozenImporter {
    pub(crate) fn new(
        registry: Arc<ImportRegistry>,
        mount: Mount,
        path: String,
        parent_segments: Vec<String>,
    ) -> Self {
        Self {
            registry,
            mount,
            path,
            parent_segments,
        }
    }

    /// The directory this importer searches.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Package components the directory corresponds to.
    pub fn parent_segments(&self) -> &[String] {
        &self.parent_segments
    }

    /// The mount the directory lies in.
    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    /// The registry this importer belongs to.
    pub fn registry(&self) -> &Arc<ImportRegistry> {
        &self.registry
    }

    /// Classify `fqmn` against this importer's directory.
    pub fn classify(&self, fqmn: &str) -> Result<Classification, ImportError> {
        let name = ModuleName::parse(fqmn)?;
        let classification = classify(
            &self.registry,
            &self.mount,
            &self.path,
            &self.parent_segments,
            &name,
        );
        log::debug!(
            "{}: {} is {}",
            self.path,
            fqmn,
            classification.module_type()
        );
        Ok(classification)
    }

    fn read_blob(&self, fqmn: &str, code_path: &str) -> Result<Vec<u8>, ImportError> {
        self.mount.read(code_path).map_err(|source| ImportError::Storage {
            fqmn: fqmn.to_string(),
            path: code_path.to_string(),
            source,
        })
    }

    fn load_code<H: HostRuntime>(
        &self,
        host: &H,
        fqmn: &str,
        code_path: &str,
    ) -> Result<H::Code, ImportError> {
        let blob = self.read_blob(fqmn, code_path)?;
        deserialize(host, &blob).map_err(|source| ImportError::Deserialize {
            fqmn: fqmn.to_string(),
            path: code_path.to_string(),
            source,
        })
    }
}

impl Finder for FrozenImporter {
    fn find_loader<H: HostRuntime>(
        &self,
        host: &H,
        fqmn: &str,
    ) -> Result<FindResult<H::Loader>, H::Error> {
        match self.classify(fqmn)? {
            Classification::Module { .. }
            | Classification::Package { .. }
            | Classification::AdjacentExtension { .. } => Ok(FindResult::Loader),
            Classification::Namespace { namespace_path } => {
                Ok(FindResult::Namespace(namespace_path))
            }
            Classification::NotFound => {
                // A dotted miss may be a builtin sub-module; ask the host's own
                // chain once. The guard stops the chain from coming back here.
                if !fqmn.contains('.') {
                    return Ok(FindResult::NotFound);
                }
                let Some(_guard) = self.registry.enter_fallback() else {
                    log::debug!("{}: fallback already active for {}", self.path, fqmn);
                    return Ok(FindResult::NotFound);
                };

                log::debug!("{}: delegating {} to the default finders", self.path, fqmn);
                Ok(match host.find_loader(fqmn)? {
                    Some(loader) => FindResult::Delegated(loader),
                    None => FindResult::NotFound,
                })
            }
        }
    }

    fn find_module<H: HostRuntime>(&self, host: &H, fqmn: &str) -> Result<Option<Self>, H::Error> {
        let found = match self.classify(fqmn)? {
            Classification::NotFound => fqmn.contains('.') && host.is_builtin(fqmn),
            _ => true,
        };
        Ok(found.then(|| self.clone()))
    }
}

impl Loader for FrozenImporter {
    fn load_module<H: HostRuntime>(&self, host: &H, fqmn: &str) -> Result<H::Module, H::Error> {
        let (code_path, namespace_path) = match self.classify(fqmn)? {
            Classification::Module { code_path } => (code_path, None),
            Classification::Package {
                code_path,
                namespace_path,
            } => (code_path, Some(namespace_path)),
            Classification::AdjacentExtension { path } => {
                log::debug!("loading extension {} from {}", fqmn, path.display());
                return host.load_dynamic(fqmn, &path);
            }
            Classification::NotFound if fqmn.contains('.') && host.is_builtin(fqmn) => {
                return host.init_builtin(fqmn);
            }
            Classification::Namespace { .. } | Classification::NotFound => {
                return Err(ImportError::NotFound(fqmn.to_string()).into());
            }
        };

        let code = self.load_code(host, fqmn, &code_path)?;

        let module = host.add_module(fqmn)?;
        host.set_module_loader(&module, self.clone())?;
        if let Some(namespace_path) = namespace_path {
            host.set_module_path(&module, vec![namespace_path])?;
        }

        host.exec_code_module(fqmn, code, &code_path)
    }

    fn get_code<H: HostRuntime>(&self, host: &H, fqmn: &str) -> Result<Option<H::Code>, H::Error> {
        match self.classify(fqmn)? {
            Classification::NotFound => Err(ImportError::NotFound(fqmn.to_string()).into()),
            Classification::Module { code_path } | Classification::Package { code_path, .. } => {
                Ok(Some(self.load_code(host, fqmn, &code_path)?))
            }
            _ => Ok(None),
        }
    }

    fn get_data(&self, path: &str) -> Result<Vec<u8>, ImportError> {
        self.registry.vfs().read(path).map_err(|source| ImportError::Storage {
            fqmn: path.to_string(),
            path: path.to_string(),
            source,
        })
    }

    fn is_package(&self, fqmn: &str) -> Result<bool, ImportError> {
        match self.classify(fqmn)? {
            Classification::NotFound => Err(ImportError::NotFound(fqmn.to_string())),
            Classification::Package { .. } => Ok(true),
            _ => Ok(false),
        }
    }

    fn get_source(&self, _fqmn: &str) -> Result<Option<String>, ImportError> {
        Ok(None)
    }
}

impl ResourceLoader for FrozenImporter {
    fn get_resource_reader(&self, fqmn: &str) -> Result<ResourceReader, ImportError> {
        match self.classify(fqmn)? {
            Classification::Package { namespace_path, .. } => Ok(ResourceReader::new(
                Arc::clone(self.mount.vfs()),
                fqmn,
                &namespace_path,
            )),
            _ => Err(ImportError::NotAPackage(fqmn.to_string())),
        }
    }
}
