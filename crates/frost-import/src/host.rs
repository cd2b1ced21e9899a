//! The seam between the importer and the host language runtime.
//!
//! The importer never creates module objects, runs code or dlopens
//! extensions itself. It asks the host, through this trait, in the same
//! order a conventional file-based loader would.

use std::path::Path;

use crate::error::ImportError;
use crate::importer::FrozenImporter;

/// Services the host runtime provides to the importer.
pub trait HostRuntime {
    /// A deserialized, directly executable code object.
    type Code;

    /// A handle to a module object owned by the host's module registry.
    type Module;

    /// Whatever the host's own finder chain hands back as a loader.
    type Loader;

    /// The host's exception type. Import failures are converted into it;
    /// errors raised by module code are already of this type.
    type Error: From<ImportError>;

    /// Turn a marshalled payload into a code object.
    fn unmarshal_code(&self, payload: &[u8]) -> Result<Self::Code, String>;

    /// Return the registered module of this name, creating an empty one if
    /// needed.
    fn add_module(&self, fqmn: &str) -> Result<Self::Module, Self::Error>;

    /// Set `__loader__` on a module.
    fn set_module_loader(
        &self,
        module: &Self::Module,
        loader: FrozenImporter,
    ) -> Result<(), Self::Error>;

    /// Set `__path__` on a module.
    fn set_module_path(&self, module: &Self::Module, path: Vec<String>) -> Result<(), Self::Error>;

    /// Execute code in the namespace of the registered module `fqmn`,
    /// recording `filename` as its `__file__`, and return the module.
    fn exec_code_module(
        &self,
        fqmn: &str,
        code: Self::Code,
        filename: &str,
    ) -> Result<Self::Module, Self::Error>;

    /// Load a native extension module from a file on disk.
    fn load_dynamic(&self, fqmn: &str, path: &Path) -> Result<Self::Module, Self::Error>;

    /// Search the host's default finder chain.
    fn find_loader(&self, fqmn: &str) -> Result<Option<Self::Loader>, Self::Error>;

    /// Whether `fqmn` is compiled into the host's builtin-module table.
    fn is_builtin(&self, fqmn: &str) -> bool;

    /// Initialise a builtin module.
    fn init_builtin(&self, fqmn: &str) -> Result<Self::Module, Self::Error>;
}
