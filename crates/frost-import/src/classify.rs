//! Module type classification.
//!
//! Given a module name and the directory a finder is bound to, decide what
//! kind of module the name refers to. The checks run in a fixed order:
//! plain module, package, adjacent extension, namespace directory. Nothing
//! is cached; every call looks at the image again.

use std::fmt;
use std::path::PathBuf;

use frost_vfs::join_path;

use crate::mount::Mount;
use crate::name::ModuleName;
use crate::registry::ImportRegistry;

/// The kind of a resolved module name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    /// `<leaf>.<compiled-suffix>`
    Module,
    /// `<leaf>/__init__.<compiled-suffix>`
    Package,
    /// A directory without `__init__`
    Namespace,
    /// `<fqmn>.<native-suffix>` on disk near the executable
    AdjacentExtension,
    /// None of the above
    NotFound,
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleType::Module => "module",
            ModuleType::Package => "package",
            ModuleType::Namespace => "namespace",
            ModuleType::AdjacentExtension => "adjacent extension",
            ModuleType::NotFound => "not found",
        };
        f.write_str(s)
    }
}

/// A classification together with the storage locations it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A plain frozen module.
    Module {
        /// Virtual path of the code blob
        code_path: String,
    },
    /// A frozen package.
    Package {
        /// Virtual path of the `__init__` code blob
        code_path: String,
        /// The package's single `__path__` entry (`base + "/"`)
        namespace_path: String,
    },
    /// A namespace portion.
    Namespace {
        /// The directory contributed to the namespace package
        namespace_path: String,
    },
    /// A native module beside the executable.
    AdjacentExtension {
        /// The extension file on disk
        path: PathBuf,
    },
    /// Nothing by that name here.
    NotFound,
}

impl Classification {
    /// The bare kind.
    pub fn module_type(&self) -> ModuleType {
        match self {
            Classification::Module { .. } => ModuleType::Module,
            Classification::Package { .. } => ModuleType::Package,
            Classification::Namespace { .. } => ModuleType::Namespace,
            Classification::AdjacentExtension { .. } => ModuleType::AdjacentExtension,
            Classification::NotFound => ModuleType::NotFound,
        }
    }

    /// Virtual path of the code blob for frozen modules and packages.
    pub fn code_path(&self) -> Option<&str> {
        match self {
            Classification::Module { code_path } | Classification::Package { code_path, .. } => {
                Some(code_path)
            }
            _ => None,
        }
    }

    /// Whether the finder can act as the loader for this result.
    pub fn is_loadable(&self) -> bool {
        matches!(
            self,
            Classification::Module { .. }
                | Classification::Package { .. }
                | Classification::AdjacentExtension { .. }
        )
    }
}

/// Classify `name` for a finder bound to `finder_path` inside `mount`.
///
/// `parent_segments` are the package components the finder's directory
/// corresponds to; a name whose parent does not match them is not this
/// finder's business.
pub fn classify(
    registry: &ImportRegistry,
    mount: &Mount,
    finder_path: &str,
    parent_segments: &[String],
    name: &ModuleName,
) -> Classification {
    let requested_parent = name.parent_segments();
    if requested_parent.len() != parent_segments.len()
        || requested_parent.iter().zip(parent_segments).any(|(a, b)| *a != b.as_str())
    {
        return Classification::NotFound;
    }

    let suffix = registry.compiled_suffix();
    let base = join_path(finder_path, name.leaf());

    let module_path = format!("{}.{}", base, suffix);
    log::trace!("checking {}", module_path);
    if mount.is_file(&module_path) {
        return Classification::Module { code_path: module_path };
    }

    let init_path = format!("{}/__init__.{}", base, suffix);
    log::trace!("checking {}", init_path);
    if mount.is_file(&init_path) {
        return Classification::Package {
            code_path: init_path,
            namespace_path: format!("{}/", base),
        };
    }

    if let Some(path) = registry.extensions().locate(name) {
        return Classification::AdjacentExtension { path };
    }

    log::trace!("checking {}/", base);
    if mount.is_dir(&base) {
        return Classification::Namespace { namespace_path: base };
    }

    Classification::NotFound
}
