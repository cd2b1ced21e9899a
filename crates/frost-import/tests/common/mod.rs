//! Shared fixtures for the importer integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use frost_import::{freeze, BundleLayout, ExtensionBridge, ImportConfig, ImportRegistry, Sandbox};
use frost_vfs::Vfs;

/// A frozen sandbox code blob.
pub fn code(json: &str) -> Vec<u8> {
    freeze(json.as_bytes())
}

/// An image with mounts `/`, `/stdlib` and `/app`.
pub fn registry(files: Vec<(&str, Vec<u8>)>, exec_dir: Option<PathBuf>) -> Arc<ImportRegistry> {
    let vfs = Vfs::from_files(files.into_iter().map(|(path, data)| (path.to_string(), data)));
    let config = ImportConfig {
        mounts: vec!["/".to_string(), "/stdlib".to_string(), "/app".to_string()],
        ..ImportConfig::default()
    };
    let extensions = ExtensionBridge::new(exec_dir, BundleLayout::default(), "so");
    Arc::new(ImportRegistry::with_extension_bridge(vfs, config, extensions).unwrap())
}

/// The image used by most scenarios.
pub fn standard_registry() -> Arc<ImportRegistry> {
    registry(
        vec![
            (
                "/stdlib/types.frz",
                code(
                    r#"[
                        {"op": "assign", "name": "NoneType", "value": "NoneType"},
                        {"op": "assign", "name": "version", "value": 3}
                    ]"#,
                ),
            ),
            (
                "/app/pkgs/__init__.frz",
                code(r#"[{"op": "assign", "name": "initialised", "value": true}]"#),
            ),
            (
                "/app/pkgs/sub.frz",
                code(r#"[{"op": "assign", "name": "name", "value": "sub"}]"#),
            ),
            ("/app/pkgs/data.bin", b"\x89frost\x00resource".to_vec()),
            ("/app/nsp/a.frz", code(r#"[{"op": "assign", "name": "side", "value": "app"}]"#)),
            ("/stdlib/nsp/b.frz", code(r#"[{"op": "assign", "name": "side", "value": "stdlib"}]"#)),
            ("/app/broken.frz", b"FRZC but not a frame".to_vec()),
            ("/app/badjson.frz", code("{not json")),
            (
                "/app/raises.frz",
                code(
                    r#"[
                        {"op": "assign", "name": "x", "value": 1},
                        {"op": "raise", "message": "boom"}
                    ]"#,
                ),
            ),
        ],
        None,
    )
}

/// A sandbox over [`standard_registry`].
pub fn standard_sandbox() -> Sandbox {
    Sandbox::new(standard_registry())
}

/// Compile a native extension exporting `frost_init_<leaf>` that returns
/// `body`, as `<dir>/<leaf>.so`. `None` when no rustc can be spawned.
pub fn build_extension(dir: &Path, leaf: &str, body: &str) -> Option<PathBuf> {
    let source = dir.join(format!("{}.rs", leaf));
    let output = dir.join(format!("{}.so", leaf));
    let code = format!(
        concat!(
            "#[no_mangle]\n",
            "pub extern \"C\" fn frost_init_{}() -> *const std::os::raw::c_char {{\n",
            "    concat!(r##\"{}\"##, \"\\0\").as_ptr().cast()\n",
            "}}\n",
        ),
        leaf, body
    );
    std::fs::write(&source, code).unwrap();

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let status = match Command::new(rustc)
        .args(["--crate-type", "cdylib", "--edition", "2021", "-o"])
        .arg(&output)
        .arg(&source)
        .status()
    {
        Ok(status) => status,
        Err(e) => {
            eprintln!("skipping native extension fixture: {}", e);
            return None;
        }
    };
    assert!(status.success(), "rustc failed to build {}", source.display());
    Some(output)
}
