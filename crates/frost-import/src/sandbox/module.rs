//! Sandbox module objects.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::code::Value;
use crate::importer::FrozenImporter;

/// What loaded a module, i.e. its `__loader__`.
#[derive(Debug, Clone)]
pub enum SandboxLoader {
    /// A frozen importer from the image
    Frozen(FrozenImporter),
    /// The builtin-module table
    Builtin,
    /// A native library on disk
    Extension(PathBuf),
}

/// A module object owned by the sandbox's module registry.
#[derive(Debug)]
pub struct SandboxModule {
    name: String,
    dict: RefCell<BTreeMap<String, Value>>,
    loader: RefCell<Option<SandboxLoader>>,
    path: RefCell<Option<Vec<String>>>,
    file: RefCell<Option<String>>,
}

impl SandboxModule {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dict: RefCell::new(BTreeMap::new()),
            loader: RefCell::new(None),
            path: RefCell::new(None),
            file: RefCell::new(None),
        }
    }

    /// `__name__`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an attribute.
    pub fn get(&self, attr: &str) -> Option<Value> {
        self.dict.borrow().get(attr).cloned()
    }

    /// Bind an attribute.
    pub fn set(&self, attr: &str, value: Value) {
        self.dict.borrow_mut().insert(attr.to_string(), value);
    }

    /// All attributes, sorted by name.
    pub fn attributes(&self) -> Vec<(String, Value)> {
        self.dict
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// `__loader__`
    pub fn loader(&self) -> Option<SandboxLoader> {
        self.loader.borrow().clone()
    }

    pub(crate) fn set_loader(&self, loader: SandboxLoader) {
        *self.loader.borrow_mut() = Some(loader);
    }

    /// `__path__`; present only for packages.
    pub fn path(&self) -> Option<Vec<String>> {
        self.path.borrow().clone()
    }

    pub(crate) fn set_path(&self, path: Vec<String>) {
        *self.path.borrow_mut() = Some(path);
    }

    /// `__file__`
    pub fn file(&self) -> Option<String> {
        self.file.borrow().clone()
    }

    pub(crate) fn set_file(&self, file: String) {
        *self.file.borrow_mut() = Some(file);
    }

    /// Whether the module has a `__path__`.
    pub fn is_package(&self) -> bool {
        self.path.borrow().is_some()
    }
}
