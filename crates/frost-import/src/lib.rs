//! Frost Import
//!
//! Module resolution and loading against a frost image:
//! - **classify**: plain module / package / namespace / adjacent extension
//! - **importer**: `FrozenImporter`, the finder, loader and resource loader
//! - **registry**: process-wide mounts, extension bridge and fallback guard
//! - **resources**: package data files as forward-only streams
//! - **native**: dlopen / LoadLibraryW for adjacent extensions
//! - **sandbox**: a small in-process host runtime
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use frost_import::{ImportConfig, ImportRegistry, Sandbox};
//!
//! let vfs = frost_vfs::detect_image()?.unwrap_or_else(frost_vfs::Vfs::empty);
//! let registry = Arc::new(ImportRegistry::new(vfs, ImportConfig::default())?);
//! let sandbox = Sandbox::new(registry);
//! let module = sandbox.import("app.main")?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod classify;
pub mod code;
pub mod config;
pub mod error;
pub mod extension;
pub mod host;
pub mod importer;
pub mod mount;
pub mod name;
pub mod native;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod sandbox;

pub use classify::{classify, Classification, ModuleType};
pub use code::{deserialize, freeze, DeserializeError, CODE_MAGIC, CODE_VERSION};
pub use config::{ConfigError, ImportConfig};
pub use error::{ImportError, ResourceError};
pub use extension::{BundleLayout, ExtensionBridge, NATIVE_SUFFIX};
pub use host::HostRuntime;
pub use importer::FrozenImporter;
pub use mount::Mount;
pub use name::ModuleName;
pub use native::{Library, LoadError};
pub use protocol::{FindResult, Finder, Loader, ResourceLoader};
pub use registry::ImportRegistry;
pub use resources::{ResourceReader, ResourceStream};
pub use sandbox::{Sandbox, SandboxCode, SandboxError, SandboxLoader, SandboxModule, Value};
