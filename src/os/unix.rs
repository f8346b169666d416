// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::os::unix::ffi::OsStrExt;
use std::io::Read;
use std::{ffi, fs, path::Path, ptr};

use crate::backend::{Address, Backend, NativeRef};
use crate::config::{Binding, Config, Scope};
use crate::error::{LoadError, ResolveError, UnloadError};

// `dlerror` keeps its message in thread-local storage on these platforms.
#[cfg(not(any(
	target_os = "linux",
	target_os = "android",
	target_os = "macos",
	target_os = "ios",
	target_os = "freebsd"
)))]
#[inline]
fn dylib_guard() -> parking_lot::MutexGuard<'static, ()> {
	static LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());
	LOCK.lock()
}

#[cfg(any(
	target_os = "linux",
	target_os = "android",
	target_os = "macos",
	target_os = "ios",
	target_os = "freebsd"
))]
#[inline(always)]
fn dylib_guard() {}

// Messages the system linkers emit when a file exists but is not a loadable image.
const FORMAT_NEEDLES: &[&str] = &[
	"invalid ELF header",
	"file too short",
	"wrong ELF class",
	"ELF load command",
	"only ET_DYN and ET_EXEC",
	"not a dynamic",
	"Exec format error",
	"not a mach-o file",
	"incompatible architecture",
	"unknown file type",
];

unsafe fn dylib_error() -> Option<String> {
	let e = libc::dlerror();
	if e.is_null() {
		None
	} else {
		Some(ffi::CStr::from_ptr(e).to_string_lossy().into_owned())
	}
}

fn flags(config: &Config) -> ffi::c_int {
	let binding = match config.binding {
		Binding::Now => libc::RTLD_NOW,
		Binding::Lazy => libc::RTLD_LAZY,
	};
	let scope = match config.scope {
		Scope::Local => libc::RTLD_LOCAL,
		Scope::Global => libc::RTLD_GLOBAL,
	};
	binding | scope
}

// `strerror` text for the errnos that mean "no file at that path".
const NOT_FOUND_NEEDLES: &[&str] = &[
	"No such file",
	"no such file",
	"image not found",
	"Not a directory",
	"File name too long",
];

// The linker is complaining about a dependency, not the library that was asked for.
const DEPENDENCY_NEEDLES: &[&str] = &["needed by", "Library not loaded"];

// Maps the errno of a failed filesystem probe. `None` means the errno says nothing definite.
fn classify_errno(path: &Path, errno: i32) -> Option<LoadError> {
	match errno {
		libc::ENOENT | libc::ENOTDIR | libc::ENAMETOOLONG => Some(LoadError::NotFound { path: path.to_owned() }),
		libc::EACCES | libc::EPERM => Some(LoadError::PermissionDenied { path: path.to_owned() }),
		_ => None,
	}
}

// Whether a "not found" message is about `path` itself.
fn names_requested(path: &Path, message: &str) -> bool {
	let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
	!name.is_empty() && message.contains(&*name) && !DEPENDENCY_NEEDLES.iter().any(|needle| message.contains(needle))
}

/// Works out why `dlopen` refused `path`.
///
/// Explicit paths are probed on the filesystem first, since `dlerror` only hands back text
/// and `dlopen` leaves errno unspecified. The reported code is the probe's errno, if any.
fn classify(path: &Path, message: String) -> LoadError {
	let path_buf = path.to_owned();
	let explicit = path.parent().map_or(false, |dir| !dir.as_os_str().is_empty());
	let mut exists = false;
	let mut code = None;
	if explicit {
		// reading the first byte also catches directories
		match fs::File::open(path).and_then(|mut file| file.read(&mut [0u8; 1])) {
			Ok(_) => exists = true,
			Err(e) => {
				if let Some(errno) = e.raw_os_error() {
					if let Some(err) = classify_errno(path, errno) {
						return err;
					}
					exists = errno == libc::EISDIR;
					code = Some(errno);
				}
			}
		}
	}
	if FORMAT_NEEDLES.iter().any(|needle| message.contains(needle)) {
		LoadError::FormatInvalid {
			path: path_buf,
			message,
		}
	} else if message.contains("Permission denied") {
		LoadError::PermissionDenied { path: path_buf }
	} else if !exists && NOT_FOUND_NEEDLES.iter().any(|needle| message.contains(needle)) && names_requested(path, &message) {
		LoadError::NotFound { path: path_buf }
	} else {
		LoadError::OsSpecific {
			path: path_buf,
			code,
			message,
		}
	}
}

unsafe fn dylib_open(path: &Path, filename: *const ffi::c_char, flags: ffi::c_int) -> Result<NativeRef, LoadError> {
	let (handle, message) = {
		let _lock = dylib_guard();
		let _ = libc::dlerror(); // clear existing errors
		let handle = libc::dlopen(filename, flags);
		(handle, dylib_error())
	};
	NativeRef::new(handle).ok_or_else(|| classify(path, message.unwrap_or_default()))
}

unsafe fn dylib_symbol(native: NativeRef, name: &str) -> Result<Address, ResolveError> {
	let not_found = || ResolveError::SymbolNotFound(name.to_owned());
	let c_str = ffi::CString::new(name).map_err(|_| not_found())?;
	let _lock = dylib_guard();
	let addr = libc::dlsym(native.as_ptr(), c_str.as_ptr());
	// a null export is not something we can call, so treat it like a missing one
	let _ = libc::dlerror();
	Address::new(addr).ok_or_else(not_found)
}

unsafe fn dylib_close(native: NativeRef) -> Result<(), UnloadError> {
	let _lock = dylib_guard();
	let _ = libc::dlerror(); // clear existing errors
	if libc::dlclose(native.as_ptr()) == 0 {
		Ok(())
	} else {
		Err(UnloadError::OsSpecific {
			code: None,
			message: dylib_error().unwrap_or_else(|| "dlclose failed".to_owned()),
		})
	}
}

/// Loads libraries from the filesystem through `dlopen`.
///
/// This is the backend on Linux, Android, macOS and the BSDs.
#[derive(Debug, Clone, Copy)]
pub struct Dlfcn {
	flags: ffi::c_int,
}

impl Dlfcn {
	pub fn new(config: &Config) -> Self {
		Self {
			flags: flags(config),
		}
	}

	/// The `RTLD_*` mode passed to `dlopen`.
	#[inline]
	pub const fn flags(&self) -> ffi::c_int {
		self.flags
	}
}

unsafe impl Backend for Dlfcn {
	fn name(&self) -> &'static str {
		"dlfcn"
	}

	unsafe fn open(&self, path: &Path) -> Result<NativeRef, LoadError> {
		// `dlopen("")` hands back the main program on some libcs.
		if path.as_os_str().is_empty() {
			return Err(LoadError::NotFound { path: path.to_owned() });
		}
		let Ok(c_str) = ffi::CString::new(path.as_os_str().as_bytes()) else {
			return Err(LoadError::NotFound { path: path.to_owned() });
		};
		dylib_open(path, c_str.as_ptr(), self.flags)
	}

	unsafe fn resolve(&self, native: NativeRef, symbol: &str) -> Result<Address, ResolveError> {
		dylib_symbol(native, symbol)
	}

	unsafe fn close(&self, native: NativeRef) -> Result<(), UnloadError> {
		dylib_close(native)
	}
}

/// Resolves symbols from the images already loaded by this process.
///
/// `path` is ignored by [`open`](Backend::open): the handle always refers to the
/// main program and its dependencies. This is how a host links a core statically.
#[derive(Debug, Clone, Copy)]
pub struct Process {
	flags: ffi::c_int,
}

impl Process {
	pub fn new(config: &Config) -> Self {
		Self {
			flags: flags(config),
		}
	}
}

unsafe impl Backend for Process {
	fn name(&self) -> &'static str {
		"process"
	}

	unsafe fn open(&self, path: &Path) -> Result<NativeRef, LoadError> {
		dylib_open(path, ptr::null(), self.flags)
	}

	unsafe fn resolve(&self, native: NativeRef, symbol: &str) -> Result<Address, ResolveError> {
		dylib_symbol(native, symbol)
	}

	unsafe fn close(&self, native: NativeRef) -> Result<(), UnloadError> {
		dylib_close(native)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_dependency() {
		let path = Path::new("libcore.so");
		let err = classify(path, "libcore.so: cannot open shared object file: No such file or directory".to_owned());
		assert!(matches!(err, LoadError::NotFound { .. }), "{err}");

		// glibc names the dependency that is missing
		let err = classify(path, "libdep.so.1: cannot open shared object file: No such file or directory".to_owned());
		assert!(matches!(err, LoadError::OsSpecific { code: None, .. }), "{err}");

		// musl names both
		let err = classify(
			path,
			"Error loading shared library libdep.so: No such file or directory (needed by /usr/lib/libcore.so)".to_owned(),
		);
		assert!(matches!(err, LoadError::OsSpecific { .. }), "{err}");
	}

	#[test]
	fn test_bare_name_errno_text() {
		let path = Path::new("libcore.so");
		let err = classify(path, "libcore.so: cannot open shared object file: File name too long".to_owned());
		assert!(matches!(err, LoadError::NotFound { .. }), "{err}");
		let err = classify(path, "libcore.so: cannot open shared object file: Not a directory".to_owned());
		assert!(matches!(err, LoadError::NotFound { .. }), "{err}");
	}

	#[test]
	fn test_probe_errno() {
		let path = Path::new("/lib/libcore.so");
		assert!(matches!(classify_errno(path, libc::ENOTDIR), Some(LoadError::NotFound { .. })));
		assert!(matches!(classify_errno(path, libc::ENAMETOOLONG), Some(LoadError::NotFound { .. })));
		assert!(matches!(classify_errno(path, libc::EACCES), Some(LoadError::PermissionDenied { .. })));
		assert!(classify_errno(path, libc::EIO).is_none());
	}
}
