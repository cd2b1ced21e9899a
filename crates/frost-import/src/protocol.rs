//! The import protocol as named traits.
//!
//! Every method takes the host runtime explicitly; importers hold no
//! reference to it.

use crate::error::ImportError;
use crate::host::HostRuntime;
use crate::resources::ResourceReader;

/// Outcome of a finder lookup.
#[derive(Debug)]
pub enum FindResult<L> {
    /// The finder itself will load the module.
    Loader,
    /// A directory contributing to a namespace package.
    Namespace(String),
    /// A loader obtained from the host's default finder chain.
    Delegated(L),
    /// Not found here.
    NotFound,
}

impl<L> FindResult<L> {
    /// Whether the lookup produced nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FindResult::NotFound)
    }
}

/// Discovery half of the protocol.
pub trait Finder {
    /// Resolve `fqmn` to a loading strategy.
    fn find_loader<H: HostRuntime>(
        &self,
        host: &H,
        fqmn: &str,
    ) -> Result<FindResult<H::Loader>, H::Error>;

    /// Legacy entry point: the finder itself when it will load `fqmn`.
    fn find_module<H: HostRuntime>(&self, host: &H, fqmn: &str) -> Result<Option<Self>, H::Error>
    where
        Self: Sized;
}

/// Loading half of the protocol.
pub trait Loader {
    /// Create, initialise and execute the module.
    fn load_module<H: HostRuntime>(&self, host: &H, fqmn: &str) -> Result<H::Module, H::Error>;

    /// The module's code object, or `None` for modules without one.
    fn get_code<H: HostRuntime>(&self, host: &H, fqmn: &str) -> Result<Option<H::Code>, H::Error>;

    /// Raw bytes of any path in the image.
    fn get_data(&self, path: &str) -> Result<Vec<u8>, ImportError>;

    /// Whether `fqmn` is a package.
    fn is_package(&self, fqmn: &str) -> Result<bool, ImportError>;

    /// Source text. Frozen modules never have any.
    fn get_source(&self, fqmn: &str) -> Result<Option<String>, ImportError>;
}

/// Resource access for packages.
pub trait ResourceLoader {
    /// A reader over the files beside package `fqmn`.
    fn get_resource_reader(&self, fqmn: &str) -> Result<ResourceReader, ImportError>;
}
