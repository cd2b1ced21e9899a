//! Native library loading for adjacent extensions
//!
//! An extension exports `frost_init_<leaf>`, a C function returning a
//! NUL-terminated UTF-8 string: the module body in the host's code format.
//! The library stays loaded for as long as the returned [`Library`] lives.

use std::ffi::{c_char, CStr, CString};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur loading a native extension
#[derive(Debug, Error)]
pub enum LoadError {
    /// The platform loader refused the file
    #[error("cannot load extension {path}: {reason}")]
    Open {
        /// Path that was attempted
        path: PathBuf,
        /// Loader diagnostic (dlerror / GetLastError)
        reason: String,
    },

    /// Symbol not found in library
    #[error("Symbol not found: {symbol} in {library}")]
    SymbolNotFound {
        /// Symbol name that was not found
        symbol: String,
        /// Library path
        library: String,
    },

    /// The init function returned null or non-UTF-8 data
    #[error("Invalid module initialization: {0}")]
    InvalidInit(String),

    /// Invalid path encoding
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Name of the init symbol for a module leaf.
pub fn init_symbol(leaf: &str) -> String {
    format!("frost_init_{}", leaf)
}

/// Cross-platform dynamic library handle
pub struct Library {
    handle: LibraryHandle,
    path: PathBuf,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}

impl Library {
    /// Load a dynamic library.
    ///
    /// Unix uses `dlopen(RTLD_NOW | RTLD_LOCAL)`, Windows `LoadLibraryW`.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let handle = LibraryHandle::load(path)?;
        log::debug!("loaded native library {}", path.display());
        Ok(Library {
            handle,
            path: path.to_path_buf(),
        })
    }

    /// Get a function pointer by name.
    ///
    /// # Safety
    ///
    /// `T` must be a function pointer type matching the exported symbol,
    /// and must not be used after the library is dropped.
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        self.handle.symbol(symbol, &self.path)
    }

    /// Call `frost_init_<leaf>` and copy out the module body it returns.
    pub fn init_module(&self, leaf: &str) -> Result<String, LoadError> {
        type InitFn = extern "C" fn() -> *const c_char;
        let symbol = init_symbol(leaf);

        // SAFETY: extensions export the init symbol with exactly this signature.
        let body = unsafe {
            let init: InitFn = self.get(&symbol)?;
            let ptr = init();
            if ptr.is_null() {
                return Err(LoadError::InvalidInit(format!("{} returned null", symbol)));
            }
            CStr::from_ptr(ptr).to_str().map(str::to_owned)
        };

        body.map_err(|e| {
            LoadError::InvalidInit(format!("{} returned invalid UTF-8: {}", symbol, e))
        })
    }

    /// Get the path this library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(windows)]
type LibraryHandle = WindowsLibrary;

#[cfg(unix)]
struct UnixLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    fn load(path: &Path) -> Result<Self, LoadError> {
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| LoadError::InvalidPath(format!("{}: {}", path.display(), e)))?;

        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };

        if handle.is_null() {
            return Err(LoadError::Open {
                path: path.to_path_buf(),
                reason: last_dl_error().unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(UnixLibrary { handle })
    }

    unsafe fn symbol<T: Copy>(&self, name: &str, lib_path: &Path) -> Result<T, LoadError> {
        let c_name = CString::new(name).map_err(|e| LoadError::SymbolNotFound {
            symbol: name.to_string(),
            library: format!("{}: {}", lib_path.display(), e),
        })?;

        // Clear any stale error
        libc::dlerror();
        let symbol = libc::dlsym(self.handle, c_name.as_ptr());

        if let Some(error) = last_dl_error() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{}: {}", lib_path.display(), error),
            });
        }
        if symbol.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: lib_path.display().to_string(),
            });
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(unix)]
fn last_dl_error() -> Option<String> {
    // SAFETY: dlerror returns null or a thread-local NUL-terminated string.
    unsafe {
        let err_ptr = libc::dlerror();
        if err_ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(err_ptr).to_string_lossy().into_owned())
        }
    }
}

#[cfg(unix)]
impl Drop for UnixLibrary {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

#[cfg(unix)]
unsafe impl Send for UnixLibrary {}
#[cfg(unix)]
unsafe impl Sync for UnixLibrary {}

#[cfg(windows)]
struct WindowsLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(windows)]
impl WindowsLibrary {
    fn load(path: &Path) -> Result<Self, LoadError> {
        use std::os::windows::ffi::OsStrExt;

        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };

        if handle.is_null() {
            let code = unsafe { GetLastError() };
            return Err(LoadError::Open {
                path: path.to_path_buf(),
                reason: format!("error code {}", code),
            });
        }

        Ok(WindowsLibrary { handle })
    }

    unsafe fn symbol<T: Copy>(&self, name: &str, lib_path: &Path) -> Result<T, LoadError> {
        let c_name = CString::new(name).map_err(|e| LoadError::SymbolNotFound {
            symbol: name.to_string(),
            library: format!("{}: {}", lib_path.display(), e),
        })?;

        let symbol = GetProcAddress(self.handle, c_name.as_ptr());

        if symbol.is_null() {
            let code = GetLastError();
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{} (error code: {})", lib_path.display(), code),
            });
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(windows)]
impl Drop for WindowsLibrary {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

#[cfg(windows)]
unsafe impl Send for WindowsLibrary {}
#[cfg(windows)]
unsafe impl Sync for WindowsLibrary {}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetProcAddress(
        module: *mut std::ffi::c_void,
        procname: *const c_char,
    ) -> *mut std::ffi::c_void;
    fn FreeLibrary(module: *mut std::ffi::c_void) -> i32;
    fn GetLastError() -> u32;
}
