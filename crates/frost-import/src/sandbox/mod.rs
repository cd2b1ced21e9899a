//! A small in-process host runtime.
//!
//! `Sandbox` implements [`HostRuntime`] with JSON statement lists as code
//! objects. It owns a module registry, a search path, a builtin-module
//! table and a meta-path walk (builtins, then search-path entries through
//! the path hook), which doubles as the default finder chain the frozen
//! importer falls back to. The CLI runs modules through it and the tests
//! use it to drive the importer end to end.

mod code;
mod module;

pub use code::{SandboxCode, Stmt, Value};
pub use module::{SandboxLoader, SandboxModule};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

use crate::error::{ImportError, ResourceError};
use crate::host::HostRuntime;
use crate::importer::FrozenImporter;
use crate::name::ModuleName;
use crate::native::{Library, LoadError};
use crate::protocol::{FindResult, Finder, Loader, ResourceLoader};
use crate::registry::ImportRegistry;

/// Errors raised inside the sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The importer failed
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Module code executed a `raise` statement
    #[error("{module}: {message}")]
    Raised {
        /// Module whose code raised
        module: String,
        /// The raised message
        message: String,
    },

    /// Loading a native extension failed
    #[error(transparent)]
    Native(#[from] LoadError),

    /// A native extension returned a body that is not valid code
    #[error("bad code from extension {fqmn}: {reason}")]
    BadExtension {
        /// Extension module name
        fqmn: String,
        /// Parse error
        reason: String,
    },

    /// Nothing on the meta path knows the name
    #[error("No module named {0:?}")]
    ModuleNotFound(String),

    /// A resource could not be read
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

enum Resolution {
    Loader(SandboxLoader),
    Namespace(Vec<String>),
    NotFound,
}

/// The sandbox host runtime.
pub struct Sandbox {
    registry: Arc<ImportRegistry>,
    modules: RefCell<HashMap<String, Rc<SandboxModule>>>,
    search_path: RefCell<Vec<String>>,
    builtins: HashMap<String, SandboxCode>,
    path_importer_cache: RefCell<HashMap<String, Option<FrozenImporter>>>,
    libraries: RefCell<Vec<Library>>,
}

impl Sandbox {
    /// Create a sandbox whose search path is seeded from the registry.
    pub fn new(registry: Arc<ImportRegistry>) -> Self {
        let search_path = registry.search_path();
        Self {
            registry,
            modules: RefCell::new(HashMap::new()),
            search_path: RefCell::new(search_path),
            builtins: HashMap::new(),
            path_importer_cache: RefCell::new(HashMap::new()),
            libraries: RefCell::new(Vec::new()),
        }
    }

    /// Add a module to the builtin-module table.
    pub fn with_builtin(mut self, name: &str, code: SandboxCode) -> Self {
        self.builtins.insert(name.to_string(), code);
        self
    }

    /// The registry this sandbox imports from.
    pub fn registry(&self) -> &Arc<ImportRegistry> {
        &self.registry
    }

    /// The current search path.
    pub fn search_path(&self) -> Vec<String> {
        self.search_path.borrow().clone()
    }

    /// Replace the search path.
    pub fn set_search_path(&self, path: Vec<String>) {
        *self.search_path.borrow_mut() = path;
    }

    /// A registered module.
    pub fn module(&self, fqmn: &str) -> Option<Rc<SandboxModule>> {
        self.modules.borrow().get(fqmn).cloned()
    }

    /// Names of every registered module, sorted.
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// The path-hook result for one search-path entry, cached per entry.
    pub fn path_finder(&self, entry: &str) -> Option<FrozenImporter> {
        if let Some(cached) = self.path_importer_cache.borrow().get(entry) {
            return cached.clone();
        }
        let finder = match self.registry.finder_for_path(entry) {
            Ok(finder) => Some(finder),
            Err(e) => {
                log::trace!("no frozen finder for {}: {}", entry, e);
                None
            }
        };
        self.path_importer_cache
            .borrow_mut()
            .insert(entry.to_string(), finder.clone());
        finder
    }

    /// Import a module, its parents first, returning the registered module.
    pub fn import(&self, fqmn: &str) -> Result<Rc<SandboxModule>, SandboxError> {
        if let Some(module) = self.module(fqmn) {
            return Ok(module);
        }

        let name = ModuleName::parse(fqmn)?;
        let (entries, parent) = match name.parent() {
            Some(parent_name) => {
                let parent = self.import(parent_name)?;
                // A parent import may have imported this module already
                if let Some(module) = self.module(fqmn) {
                    return Ok(module);
                }
                let Some(path) = parent.path() else {
                    return Err(SandboxError::ModuleNotFound(format!(
                        "{}; {} is not a package",
                        fqmn, parent_name
                    )));
                };
                (path, Some(parent))
            }
            None => (self.search_path(), None),
        };

        let resolution = if !name.is_dotted() && self.builtins.contains_key(fqmn) {
            Resolution::Loader(SandboxLoader::Builtin)
        } else {
            self.walk_path(fqmn, &entries)?
        };

        let module = match resolution {
            Resolution::Loader(loader) => {
                let result = self.load_with(fqmn, &loader);
                if result.is_err() {
                    self.modules.borrow_mut().remove(fqmn);
                }
                result?
            }
            Resolution::Namespace(portions) => {
                log::debug!("{} is a namespace package over {:?}", fqmn, portions);
                let module = self.register(fqmn);
                module.set_path(portions);
                module
            }
            Resolution::NotFound => return Err(SandboxError::ModuleNotFound(fqmn.to_string())),
        };

        if let Some(parent) = parent {
            parent.set(name.leaf(), Value::Module(fqmn.to_string()));
        }
        Ok(module)
    }

    fn load_with(
        &self,
        fqmn: &str,
        loader: &SandboxLoader,
    ) -> Result<Rc<SandboxModule>, SandboxError> {
        match loader {
            SandboxLoader::Frozen(importer) => importer.load_module(self, fqmn),
            SandboxLoader::Builtin => self.init_builtin(fqmn),
            SandboxLoader::Extension(path) => self.load_dynamic(fqmn, path),
        }
    }

    /// Ask every search-path entry in turn, collecting namespace portions.
    fn walk_path(&self, fqmn: &str, entries: &[String]) -> Result<Resolution, SandboxError> {
        let mut portions = Vec::new();
        for entry in entries {
            let Some(finder) = self.path_finder(entry) else {
                continue;
            };
            match finder.find_loader(self, fqmn)? {
                FindResult::Loader => return Ok(Resolution::Loader(SandboxLoader::Frozen(finder))),
                FindResult::Delegated(loader) => return Ok(Resolution::Loader(loader)),
                FindResult::Namespace(portion) => portions.push(portion),
                FindResult::NotFound => {}
            }
        }

        if portions.is_empty() {
            Ok(Resolution::NotFound)
        } else {
            Ok(Resolution::Namespace(portions))
        }
    }

    fn register(&self, fqmn: &str) -> Rc<SandboxModule> {
        let module = Rc::new(SandboxModule::new(fqmn));
        self.modules
            .borrow_mut()
            .insert(fqmn.to_string(), Rc::clone(&module));
        module
    }

    fn exec(&self, module: &SandboxModule, code: &SandboxCode) -> Result<(), SandboxError> {
        for stmt in &code.stmts {
            match stmt {
                Stmt::Assign { name, value } => module.set(name, value.clone()),
                Stmt::Import { module: target, alias } => {
                    self.import(target)?;
                    match alias {
                        Some(alias) => module.set(alias, Value::Module(target.clone())),
                        None => {
                            let top = target.split('.').next().unwrap_or(target);
                            module.set(top, Value::Module(top.to_string()));
                        }
                    }
                }
                Stmt::ReadResource {
                    package,
                    resource,
                    target,
                } => {
                    let data = self.read_resource(package, resource)?;
                    module.set(target, Value::Bytes(data));
                }
                Stmt::Raise { message } => {
                    return Err(SandboxError::Raised {
                        module: module.name().to_string(),
                        message: message.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Read a resource of an imported package.
    pub fn read_resource(&self, package: &str, resource: &str) -> Result<Vec<u8>, SandboxError> {
        let module = self.import(package)?;
        let Some(SandboxLoader::Frozen(importer)) = module.loader() else {
            return Err(ImportError::NotAPackage(package.to_string()).into());
        };
        let reader = importer.get_resource_reader(package)?;
        let mut stream = reader.open_resource(resource)?;
        let data = stream.read_to_end()?;
        stream.close();
        Ok(data)
    }
}

impl HostRuntime for Sandbox {
    type Code = SandboxCode;
    type Module = Rc<SandboxModule>;
    type Loader = SandboxLoader;
    type Error = SandboxError;

    fn unmarshal_code(&self, payload: &[u8]) -> Result<SandboxCode, String> {
        SandboxCode::parse(payload)
    }

    fn add_module(&self, fqmn: &str) -> Result<Rc<SandboxModule>, SandboxError> {
        Ok(self.module(fqmn).unwrap_or_else(|| self.register(fqmn)))
    }

    fn set_module_loader(
        &self,
        module: &Rc<SandboxModule>,
        loader: FrozenImporter,
    ) -> Result<(), SandboxError> {
        module.set_loader(SandboxLoader::Frozen(loader));
        Ok(())
    }

    fn set_module_path(
        &self,
        module: &Rc<SandboxModule>,
        path: Vec<String>,
    ) -> Result<(), SandboxError> {
        module.set_path(path);
        Ok(())
    }

    fn exec_code_module(
        &self,
        fqmn: &str,
        code: SandboxCode,
        filename: &str,
    ) -> Result<Rc<SandboxModule>, SandboxError> {
        let module = self.add_module(fqmn)?;
        module.set_file(filename.to_string());
        if let Err(e) = self.exec(&module, &code) {
            self.modules.borrow_mut().remove(fqmn);
            return Err(e);
        }
        Ok(module)
    }

    fn load_dynamic(&self, fqmn: &str, path: &Path) -> Result<Rc<SandboxModule>, SandboxError> {
        let name = ModuleName::parse(fqmn)?;
        let library = Library::open(path)?;
        let body = library.init_module(name.leaf())?;
        let code = SandboxCode::parse(body.as_bytes()).map_err(|reason| SandboxError::BadExtension {
            fqmn: fqmn.to_string(),
            reason,
        })?;
        self.libraries.borrow_mut().push(library);

        let module = self.add_module(fqmn)?;
        module.set_loader(SandboxLoader::Extension(path.to_path_buf()));
        module.set_file(path.display().to_string());
        if let Err(e) = self.exec(&module, &code) {
            self.modules.borrow_mut().remove(fqmn);
            return Err(e);
        }
        Ok(module)
    }

    fn find_loader(&self, fqmn: &str) -> Result<Option<SandboxLoader>, SandboxError> {
        if self.builtins.contains_key(fqmn) {
            return Ok(Some(SandboxLoader::Builtin));
        }

        let name = ModuleName::parse(fqmn)?;
        let entries = match name.parent() {
            Some(parent) => match self.module(parent).and_then(|m| m.path()) {
                Some(path) => path,
                None => return Ok(None),
            },
            None => self.search_path(),
        };

        match self.walk_path(fqmn, &entries)? {
            Resolution::Loader(loader) => Ok(Some(loader)),
            Resolution::Namespace(_) | Resolution::NotFound => Ok(None),
        }
    }

    fn is_builtin(&self, fqmn: &str) -> bool {
        self.builtins.contains_key(fqmn)
    }

    fn init_builtin(&self, fqmn: &str) -> Result<Rc<SandboxModule>, SandboxError> {
        let code = self
            .builtins
            .get(fqmn)
            .ok_or_else(|| SandboxError::ModuleNotFound(fqmn.to_string()))?;
        let module = self.add_module(fqmn)?;
        module.set_loader(SandboxLoader::Builtin);
        if let Err(e) = self.exec(&module, code) {
            self.modules.borrow_mut().remove(fqmn);
            return Err(e);
        }
        Ok(module)
    }
}
