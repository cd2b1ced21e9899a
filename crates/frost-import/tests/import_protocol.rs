//! End-to-end finder and loader behaviour through the sandbox host.

mod common;

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use common::{code, registry, standard_registry, standard_sandbox};
use frost_import::{
    BundleLayout, DeserializeError, ExtensionBridge, FindResult, Finder, FrozenImporter,
    HostRuntime, ImportConfig, ImportError, ImportRegistry, Loader, ModuleType, Sandbox,
    SandboxCode, SandboxError, SandboxLoader, Value,
};

#[test]
fn test_stdlib_plain_module() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/stdlib").unwrap();

    assert!(matches!(finder.find_loader(&sandbox, "types").unwrap(), FindResult::Loader));

    let types = finder.load_module(&sandbox, "types").unwrap();
    assert_eq!(types.path(), None);
    assert_eq!(types.file().as_deref(), Some("/stdlib/types.frz"));
    assert!(matches!(types.loader(), Some(SandboxLoader::Frozen(_))));
    assert_eq!(
        types.attributes(),
        vec![
            ("NoneType".to_string(), Value::Str("NoneType".to_string())),
            ("version".to_string(), Value::Int(3)),
        ]
    );
}

#[test]
fn test_package_path_and_submodule() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/app").unwrap();

    assert!(finder.is_package("pkgs").unwrap());
    let pkgs = finder.load_module(&sandbox, "pkgs").unwrap();
    let path = pkgs.path().unwrap();
    assert_eq!(path, vec!["/app/pkgs/".to_string()]);
    assert_eq!(pkgs.get("initialised"), Some(Value::Bool(true)));

    let sub_finder = sandbox.registry().finder_for_path(&path[0]).unwrap();
    assert_eq!(sub_finder.parent_segments(), ["pkgs".to_string()]);
    assert!(matches!(sub_finder.find_loader(&sandbox, "pkgs.sub").unwrap(), FindResult::Loader));
    assert!(!sub_finder.is_package("pkgs.sub").unwrap());

    let sub = sub_finder.load_module(&sandbox, "pkgs.sub").unwrap();
    assert_eq!(sub.get("name"), Some(Value::Str("sub".to_string())));
}

#[test]
fn test_import_through_search_path() {
    let sandbox = standard_sandbox();
    let sub = sandbox.import("pkgs.sub").unwrap();
    assert_eq!(sub.name(), "pkgs.sub");
    assert_eq!(sandbox.module_names(), vec!["pkgs", "pkgs.sub"]);
}

#[test]
fn test_bare_directory_is_namespace_portion() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/app").unwrap();

    match finder.find_loader(&sandbox, "nsp").unwrap() {
        FindResult::Namespace(portion) => assert_eq!(portion, "/app/nsp"),
        other => panic!("expected a namespace portion, got {:?}", other),
    }
    assert_eq!(finder.classify("nsp").unwrap().module_type(), ModuleType::Namespace);
    assert!(!finder.is_package("nsp").unwrap());
    assert!(finder.get_code(&sandbox, "nsp").unwrap().is_none());
}

#[test]
fn test_namespace_portions_are_merged() {
    let sandbox = standard_sandbox();
    let nsp = sandbox.import("nsp").unwrap();
    assert_eq!(nsp.path().unwrap(), vec!["/stdlib/nsp".to_string(), "/app/nsp".to_string()]);
    assert!(nsp.loader().is_none());

    assert_eq!(sandbox.import("nsp.a").unwrap().get("side"), Some(Value::Str("app".to_string())));
    assert_eq!(
        sandbox.import("nsp.b").unwrap().get("side"),
        Some(Value::Str("stdlib".to_string()))
    );
}

#[test]
fn test_not_found() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/stdlib").unwrap();

    assert!(finder.find_loader(&sandbox, "missing").unwrap().is_not_found());
    assert!(finder.find_module(&sandbox, "missing").unwrap().is_none());
    assert!(matches!(
        finder.load_module(&sandbox, "missing"),
        Err(SandboxError::Import(ImportError::NotFound(name))) if name == "missing"
    ));
    assert!(matches!(
        finder.get_code(&sandbox, "missing"),
        Err(SandboxError::Import(ImportError::NotFound(_)))
    ));
    assert!(matches!(finder.is_package("missing"), Err(ImportError::NotFound(_))));
    assert!(matches!(
        sandbox.import("missing"),
        Err(SandboxError::ModuleNotFound(name)) if name == "missing"
    ));
}

#[test]
fn test_invalid_names_are_rejected() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/").unwrap();
    assert!(matches!(
        finder.find_loader(&sandbox, "pkgs..sub"),
        Err(SandboxError::Import(ImportError::InvalidName(_)))
    ));
    assert!(matches!(finder.is_package(""), Err(ImportError::InvalidName(_))));
}

#[test]
fn test_fallback_reentering_same_finder_terminates() {
    let sandbox = standard_sandbox();
    sandbox.import("pkgs").unwrap();
    let finder = sandbox.path_finder("/app/pkgs/").unwrap();

    // The default chain walks pkgs.__path__ and comes straight back here.
    let result = finder.find_loader(&sandbox, "pkgs.missing").unwrap();
    assert!(result.is_not_found());
    assert!(!sandbox.registry().fallback_active());

    assert!(matches!(
        sandbox.import("pkgs.missing"),
        Err(SandboxError::ModuleNotFound(_))
    ));
}

#[test]
fn test_dotted_builtin_is_delegated() {
    let builtin =
        SandboxCode::parse(br#"[{"op": "assign", "name": "fast", "value": true}]"#).unwrap();
    let sandbox = Sandbox::new(standard_registry()).with_builtin("pkgs._speedups", builtin);
    sandbox.import("pkgs").unwrap();
    let finder = sandbox.path_finder("/app/pkgs/").unwrap();

    assert!(matches!(
        finder.find_loader(&sandbox, "pkgs._speedups").unwrap(),
        FindResult::Delegated(SandboxLoader::Builtin)
    ));
    assert!(!sandbox.registry().fallback_active());

    let speedups = sandbox.import("pkgs._speedups").unwrap();
    assert_eq!(speedups.get("fast"), Some(Value::Bool(true)));
    assert!(matches!(speedups.loader(), Some(SandboxLoader::Builtin)));
}

#[test]
fn test_undotted_miss_is_not_delegated() {
    let builtin = SandboxCode::parse(b"[]").unwrap();
    let sandbox = Sandbox::new(standard_registry()).with_builtin("_io", builtin);
    let finder = sandbox.registry().finder_for_path("/stdlib").unwrap();

    assert!(finder.find_loader(&sandbox, "_io").unwrap().is_not_found());
}

#[test]
fn test_legacy_find_module_and_builtin_load() {
    let builtin =
        SandboxCode::parse(br#"[{"op": "assign", "name": "legacy", "value": 1}]"#).unwrap();
    let sandbox = Sandbox::new(standard_registry()).with_builtin("pkgs._legacy", builtin);
    let finder = sandbox.registry().finder_for_path("/app/pkgs").unwrap();

    assert!(finder.find_module(&sandbox, "pkgs.sub").unwrap().is_some());
    let importer = finder.find_module(&sandbox, "pkgs._legacy").unwrap().unwrap();
    assert_eq!(importer.path(), "/app/pkgs");

    let module = importer.load_module(&sandbox, "pkgs._legacy").unwrap();
    assert_eq!(module.get("legacy"), Some(Value::Int(1)));
}

#[test]
fn test_corrupt_blob_is_a_deserialize_error() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/app").unwrap();

    match finder.load_module(&sandbox, "broken") {
        Err(SandboxError::Import(ImportError::Deserialize { fqmn, path, .. })) => {
            assert_eq!(fqmn, "broken");
            assert_eq!(path, "/app/broken.frz");
        }
        other => panic!("expected a deserialize error, got {:?}", other),
    }
    assert!(sandbox.module("broken").is_none());

    assert!(matches!(
        finder.get_code(&sandbox, "badjson"),
        Err(SandboxError::Import(ImportError::Deserialize {
            source: DeserializeError::Unmarshal(_),
            ..
        }))
    ));
}

#[test]
fn test_execution_error_passes_through() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/app").unwrap();

    match finder.load_module(&sandbox, "raises") {
        Err(SandboxError::Raised { module, message }) => {
            assert_eq!(module, "raises");
            assert_eq!(message, "boom");
        }
        other => panic!("expected the module's own error, got {:?}", other),
    }
    assert!(sandbox.module("raises").is_none());
}

#[test]
fn test_reload_reuses_module_object() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/stdlib").unwrap();

    let first = finder.load_module(&sandbox, "types").unwrap();
    first.set("patched", Value::Bool(true));
    let second = finder.load_module(&sandbox, "types").unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(second.get("version"), Some(Value::Int(3)));
}

#[test]
fn test_get_code_get_data_get_source() {
    let sandbox = standard_sandbox();
    let finder = sandbox.registry().finder_for_path("/stdlib").unwrap();

    let code = finder.get_code(&sandbox, "types").unwrap().unwrap();
    assert_eq!(code.stmts.len(), 2);

    assert_eq!(finder.get_data("/app/pkgs/data.bin").unwrap(), b"\x89frost\x00resource");
    assert!(matches!(
        finder.get_data("/app/pkgs/nope.bin"),
        Err(ImportError::Storage { path, .. }) if path == "/app/pkgs/nope.bin"
    ));
    assert_eq!(finder.get_source("types").unwrap(), None);
}

#[test]
fn test_storage_failure_names_the_path() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("gone.frz"), code("[]")).unwrap();
    let vfs = frost_vfs::Vfs::from_disk(temp.path()).unwrap();
    std::fs::remove_file(temp.path().join("gone.frz")).unwrap();

    let extensions = ExtensionBridge::new(None, BundleLayout::default(), "so");
    let registry = Arc::new(
        ImportRegistry::with_extension_bridge(vfs, ImportConfig::default(), extensions).unwrap(),
    );
    let sandbox = Sandbox::new(registry);
    let finder = sandbox.registry().finder_for_path("/").unwrap();

    match finder.load_module(&sandbox, "gone") {
        Err(SandboxError::Import(ImportError::Storage { fqmn, path, .. })) => {
            assert_eq!(fqmn, "gone");
            assert_eq!(path, "/gone.frz");
        }
        other => panic!("expected a storage error, got {:?}", other),
    }
}

#[test]
fn test_package_imports_its_submodule_during_init() {
    let sandbox = Sandbox::new(registry(
        vec![
            (
                "/app/outer/__init__.frz",
                code(r#"[{"op": "import", "module": "outer.inner", "alias": "inner"}]"#),
            ),
            ("/app/outer/inner.frz", code(r#"[{"op": "assign", "name": "depth", "value": 2}]"#)),
        ],
        None,
    ));

    let outer = sandbox.import("outer").unwrap();
    assert_eq!(outer.get("inner"), Some(Value::Module("outer.inner".to_string())));
    assert_eq!(sandbox.module("outer.inner").unwrap().get("depth"), Some(Value::Int(2)));
}

/// A host whose default chain parks `pkgs.slow` until the test releases it.
struct BlockingHost {
    barrier: std::sync::Barrier,
}

impl HostRuntime for BlockingHost {
    type Code = Vec<u8>;
    type Module = String;
    type Loader = String;
    type Error = ImportError;

    fn unmarshal_code(&self, payload: &[u8]) -> Result<Vec<u8>, String> {
        Ok(payload.to_vec())
    }

    fn add_module(&self, fqmn: &str) -> Result<String, ImportError> {
        Ok(fqmn.to_string())
    }

    fn set_module_loader(
        &self,
        _module: &String,
        _loader: FrozenImporter,
    ) -> Result<(), ImportError> {
        Ok(())
    }

    fn set_module_path(&self, _module: &String, _path: Vec<String>) -> Result<(), ImportError> {
        Ok(())
    }

    fn exec_code_module(
        &self,
        fqmn: &str,
        _code: Vec<u8>,
        _filename: &str,
    ) -> Result<String, ImportError> {
        Ok(fqmn.to_string())
    }

    fn load_dynamic(&self, fqmn: &str, _path: &Path) -> Result<String, ImportError> {
        Err(ImportError::NotFound(fqmn.to_string()))
    }

    fn find_loader(&self, fqmn: &str) -> Result<Option<String>, ImportError> {
        if fqmn == "pkgs.slow" {
            self.barrier.wait();
            self.barrier.wait();
        }
        let leaf = fqmn.rsplit('.').next().unwrap_or(fqmn);
        Ok(Some(format!("{}-builtin", leaf)))
    }

    fn is_builtin(&self, _fqmn: &str) -> bool {
        false
    }

    fn init_builtin(&self, fqmn: &str) -> Result<String, ImportError> {
        Err(ImportError::NotFound(fqmn.to_string()))
    }
}

#[test]
fn test_concurrent_fallbacks_for_different_names() {
    let host = Arc::new(BlockingHost {
        barrier: std::sync::Barrier::new(2),
    });
    let finder = standard_registry().finder_for_path("/app/pkgs").unwrap();

    let slow = {
        let host = Arc::clone(&host);
        let finder = finder.clone();
        thread::spawn(move || finder.find_loader(&*host, "pkgs.slow"))
    };

    // The other thread is now inside its delegation
    host.barrier.wait();
    let fast = finder.find_loader(&*host, "pkgs.fast");
    host.barrier.wait();

    let slow = slow.join().unwrap();
    assert!(matches!(fast, Ok(FindResult::Delegated(ref loader)) if loader == "fast-builtin"));
    assert!(matches!(slow, Ok(FindResult::Delegated(ref loader)) if loader == "slow-builtin"));
    assert!(!finder.registry().fallback_active());
}
