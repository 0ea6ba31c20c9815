//! Owning wrapper around an OS library handle.

use std::ffi::c_void;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::build_native_catalog;
use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::model::SymbolRecord;
use crate::reader::SymbolProbe;
use crate::resolver::Resolver;

/// File name prefix and suffix added to the library name before loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorations {
    pub prefix: String,
    pub suffix: String,
}

impl Decorations {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), suffix: suffix.into() }
    }

    /// `lib`/`.so` on Linux and the BSDs, `lib`/`.dylib` on macOS, `.dll` on Windows.
    pub fn os_default() -> Self {
        Self::new(std::env::consts::DLL_PREFIX, std::env::consts::DLL_SUFFIX)
    }

    pub fn none() -> Self {
        Self::new("", "")
    }

    pub fn decorate(&self, file_name: &str) -> String {
        format!("{}{}{}", self.prefix, file_name, self.suffix)
    }
}

impl Default for Decorations {
    fn default() -> Self {
        Self::os_default()
    }
}

/// A loaded shared library.
///
/// Dropping the value unloads the library. After [`Library::take`] or
/// [`Library::close`] every operation fails with [`Error::Released`].
#[derive(Debug)]
pub struct Library {
    handle: Option<libloading::Library>,
    path: PathBuf,
    resolver: Resolver,
}

impl Library {
    /// Load `path`, decorating its final component.
    ///
    /// The path must contain a directory part (`./plugin` rather than
    /// `plugin`) so the OS search path is never consulted.
    pub fn open(path: impl AsRef<Path>, decorations: &Decorations) -> Result<Self> {
        let path = decorated_path(path.as_ref(), decorations)?;
        let handle = open_native(&path)?;
        debug!("loaded {}", path.display());
        Ok(Self { handle: Some(handle), path, resolver: Resolver::default() })
    }

    /// Like [`Library::open`], with decorations and matching rules taken from `config`.
    pub fn open_with(path: impl AsRef<Path>, config: &LoaderConfig) -> Result<Self> {
        let mut library = Self::open(path, &config.decorations.decorations())?;
        library.resolver = config.resolver();
        Ok(library)
    }

    /// Full path of the loaded file, decorations included.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    pub fn native_handle(&self) -> Option<&libloading::Library> {
        self.handle.as_ref()
    }

    pub fn resolver(&self) -> Resolver {
        self.resolver
    }

    /// Enumerate the exported symbols of the loaded file.
    pub fn symbols(&self) -> Result<Vec<SymbolRecord>> {
        let handle = self.handle()?;
        let bytes = fs::read(&self.path)
            .map_err(|source| Error::Io { path: self.path.clone(), source })?;
        let records = build_native_catalog(&bytes, &HandleProbe(handle))?;
        debug!("{} symbols in {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Address of the symbol named `name`.
    ///
    /// `name` is first looked up as a raw exported name. When that fails it is
    /// matched against the demangled signatures of the library, so
    /// `tools::adder(double, double)` finds `_ZN5tools5adderEdd`.
    pub fn get_symbol(&self, name: &str) -> Result<*mut c_void> {
        self.resolve_symbol(name).map(|(_, address)| address)
    }

    /// Like [`Library::get_symbol`], also returning the raw exported name the
    /// lookup landed on.
    pub fn resolve_symbol(&self, name: &str) -> Result<(String, *mut c_void)> {
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "The symbol name to lookup is an empty string".into(),
            ));
        }
        let handle = self.handle()?;
        let native_error = match locate(handle, name) {
            Ok(address) => return Ok((name.to_string(), address)),
            Err(message) => message,
        };

        debug!("direct lookup of '{name}' failed, matching demangled names");
        let catalog = self.symbols()?;
        let record = self.resolver.resolve(name, &catalog, &native_error)?;
        match locate(handle, &record.name) {
            Ok(address) => Ok((record.name.clone(), address)),
            Err(native) => Err(relocate_failed(name, &record.name, &native)),
        }
    }

    /// Function pointer for `name`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the exported function.
    pub unsafe fn get_function<F: Copy>(&self, name: &str) -> Result<F> {
        if mem::size_of::<F>() != mem::size_of::<*mut c_void>() {
            return Err(Error::InvalidArgument(format!(
                "'{}' is not a pointer-sized function type",
                std::any::type_name::<F>()
            )));
        }
        let address = self.get_symbol(name)?;
        Ok(mem::transmute_copy::<*mut c_void, F>(&address))
    }

    /// Shared reference to the exported variable `name`.
    ///
    /// # Safety
    ///
    /// The export must be a properly aligned, initialized `T`.
    pub unsafe fn get_variable<T>(&self, name: &str) -> Result<&T> {
        let address = self.get_symbol(name)?;
        Ok(&*(address as *const T))
    }

    /// Mutable reference to the exported variable `name`.
    ///
    /// # Safety
    ///
    /// Same as [`Library::get_variable`]; the variable must also be writable
    /// and not aliased elsewhere.
    pub unsafe fn get_variable_mut<T>(&mut self, name: &str) -> Result<&mut T> {
        let address = self.get_symbol(name)?;
        Ok(&mut *(address as *mut T))
    }

    /// Move the handle into a new value, leaving `self` released.
    pub fn take(&mut self) -> Library {
        Library { handle: self.handle.take(), path: self.path.clone(), resolver: self.resolver }
    }

    /// Unload the library now instead of on drop.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::Released)?;
        handle
            .close()
            .map_err(|err| Error::Load { path: self.path.clone(), message: err.to_string() })
    }

    fn handle(&self) -> Result<&libloading::Library> {
        self.handle.as_ref().ok_or(Error::Released)
    }
}

/// Validate `path` and decorate its file name.
fn decorated_path(path: &Path, decorations: &Decorations) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    #[cfg(windows)]
    let raw = raw.replace('\\', "/");

    if raw.is_empty() {
        return Err(Error::InvalidArgument("The library path to lookup is an empty string".into()));
    }
    let Some(split) = raw.rfind('/') else {
        return Err(Error::InvalidArgument(format!("Could not load library '{raw}': invalid path")));
    };
    let (dir, file_name) = (&raw[..split], &raw[split + 1..]);
    if file_name.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "Could not load library '{raw}': a directory was provided"
        )));
    }
    Ok(PathBuf::from(format!("{dir}/{}", decorations.decorate(file_name))))
}

#[cfg(unix)]
fn open_native(path: &Path) -> Result<libloading::Library> {
    use libloading::os::unix::{Library, RTLD_LOCAL, RTLD_NOW};

    // SAFETY: library initializers run here; callers opt into that by loading.
    unsafe { Library::open(Some(path), RTLD_NOW | RTLD_LOCAL) }
        .map(Into::into)
        .map_err(|err| Error::Load { path: path.to_path_buf(), message: err.to_string() })
}

#[cfg(not(unix))]
fn open_native(path: &Path) -> Result<libloading::Library> {
    // SAFETY: library initializers run here; callers opt into that by loading.
    unsafe { libloading::Library::new(path) }
        .map_err(|err| Error::Load { path: path.to_path_buf(), message: err.to_string() })
}

/// Ask the loader for `name`; the error is the loader's own message.
fn locate(handle: &libloading::Library, name: &str) -> std::result::Result<*mut c_void, String> {
    // SAFETY: the address is only read out, never called through here.
    let symbol =
        unsafe { handle.get::<*mut c_void>(name.as_bytes()) }.map_err(|err| err.to_string())?;
    let address = *symbol;
    if address.is_null() {
        return Err(format!("symbol '{name}' resolved to a null address"));
    }
    Ok(address)
}

/// The query matched `raw`, but the loader no longer resolves it.
fn relocate_failed(query: &str, raw: &str, native: &str) -> Error {
    Error::SymbolNotFound {
        name: query.to_string(),
        native: format!("matched '{raw}', which the loader rejected: {native}"),
    }
}

struct HandleProbe<'a>(&'a libloading::Library);

impl SymbolProbe for HandleProbe<'_> {
    fn is_loadable(&self, name: &str) -> bool {
        locate(self.0, name).is_ok()
    }
}
