// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::os::windows::ffi::OsStrExt;
use std::{ffi, io, path::Path, ptr};

use crate::backend::{Address, Backend, NativeRef};
use crate::config::{Config, DllSearch};
use crate::error::{LoadError, ResolveError, UnloadError};

mod c;

fn to_wide(path: &ffi::OsStr) -> Vec<u16> {
	path.encode_wide().chain(std::iter::once(0u16)).collect()
}

fn classify(path: &Path, error: io::Error) -> LoadError {
	let path = path.to_owned();
	match error.raw_os_error() {
		Some(c::ERROR_FILE_NOT_FOUND | c::ERROR_PATH_NOT_FOUND | c::ERROR_MOD_NOT_FOUND) => {
			LoadError::NotFound { path }
		}
		Some(c::ERROR_ACCESS_DENIED) => LoadError::PermissionDenied { path },
		Some(c::ERROR_BAD_FORMAT | c::ERROR_BAD_EXE_FORMAT | c::ERROR_EXE_MACHINE_TYPE_MISMATCH) => {
			LoadError::FormatInvalid {
				path,
				message: error.to_string(),
			}
		}
		code => LoadError::OsSpecific {
			path,
			code,
			message: error.to_string(),
		},
	}
}

// Keeps the "missing dll" dialog box from popping up while a library loads.
struct ErrorModeGuard(Option<c::DWORD>);

impl ErrorModeGuard {
	unsafe fn new(quiet: bool) -> Self {
		if !quiet {
			return Self(None);
		}
		let mut previous = 0;
		if c::SetThreadErrorMode(c::SEM_FAILCRITICALERRORS, &mut previous) == 0 {
			Self(None)
		} else {
			Self(Some(previous))
		}
	}
}

impl Drop for ErrorModeGuard {
	fn drop(&mut self) {
		if let Some(previous) = self.0 {
			unsafe { c::SetThreadErrorMode(previous, ptr::null_mut()) };
		}
	}
}

unsafe fn dylib_symbol(native: NativeRef, name: &str) -> Result<Address, ResolveError> {
	let not_found = || ResolveError::SymbolNotFound(name.to_owned());
	let c_str = ffi::CString::new(name).map_err(|_| not_found())?;
	Address::new(c::GetProcAddress(native.as_ptr(), c_str.as_ptr())).ok_or_else(not_found)
}

unsafe fn dylib_close(native: NativeRef) -> Result<(), UnloadError> {
	if c::FreeLibrary(native.as_ptr()) == 0 {
		let error = io::Error::last_os_error();
		Err(UnloadError::OsSpecific {
			code: error.raw_os_error(),
			message: error.to_string(),
		})
	} else {
		Ok(())
	}
}

/// Loads libraries from the filesystem through `LoadLibraryExW`.
#[derive(Debug, Clone, Copy)]
pub struct Win32 {
	flags: c::DWORD,
	quiet: bool,
}

impl Win32 {
	pub fn new(config: &Config) -> Self {
		let flags = match config.search {
			DllSearch::System => 0,
			DllSearch::DefaultDirs => c::LOAD_LIBRARY_SEARCH_DEFAULT_DIRS | c::LOAD_LIBRARY_SAFE_CURRENT_DIRS,
		};
		Self {
			flags,
			quiet: config.quiet_errors,
		}
	}

	/// The flags passed to `LoadLibraryExW`.
	#[inline]
	pub const fn flags(&self) -> u32 {
		self.flags
	}
}

unsafe impl Backend for Win32 {
	fn name(&self) -> &'static str {
		"win32"
	}

	unsafe fn open(&self, path: &Path) -> Result<NativeRef, LoadError> {
		let os_str = path.as_os_str();
		if os_str.is_empty() || os_str.encode_wide().any(|unit| unit == 0) {
			return Err(LoadError::NotFound { path: path.to_owned() });
		}
		let wide_str = to_wide(os_str);
		let _mode = ErrorModeGuard::new(self.quiet);
		let handle = c::LoadLibraryExW(wide_str.as_ptr(), ptr::null_mut(), self.flags);
		// windows dumps *all* error info into this call.
		let error = io::Error::last_os_error();
		NativeRef::new(handle).ok_or_else(|| classify(path, error))
	}

	unsafe fn resolve(&self, native: NativeRef, symbol: &str) -> Result<Address, ResolveError> {
		dylib_symbol(native, symbol)
	}

	unsafe fn close(&self, native: NativeRef) -> Result<(), UnloadError> {
		dylib_close(native)
	}
}

/// Resolves symbols from the executable image of this process.
///
/// `path` is ignored by [`open`](Backend::open). The module reference count is
/// incremented, so [`close`](Backend::close) is balanced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Process;

impl Process {
	pub fn new(_: &Config) -> Self {
		Self
	}
}

unsafe impl Backend for Process {
	fn name(&self) -> &'static str {
		"process"
	}

	unsafe fn open(&self, path: &Path) -> Result<NativeRef, LoadError> {
		let mut handle = ptr::null_mut();
		if c::GetModuleHandleExW(0, ptr::null(), &mut handle) == 0 {
			return Err(classify(path, io::Error::last_os_error()));
		}
		NativeRef::new(handle).ok_or_else(|| LoadError::NotFound { path: path.to_owned() })
	}

	unsafe fn resolve(&self, native: NativeRef, symbol: &str) -> Result<Address, ResolveError> {
		dylib_symbol(native, symbol)
	}

	unsafe fn close(&self, native: NativeRef) -> Result<(), UnloadError> {
		dylib_close(native)
	}
}
