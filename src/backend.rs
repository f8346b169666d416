// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::{ffi, fmt, path::Path, ptr::NonNull, sync::Arc};

use crate::config::Config;
use crate::error::{LoadError, ResolveError, SessionError, UnloadError};

/// Opaque reference to a module mapped by a [`Backend`].
///
/// Only meaningful to the backend that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NativeRef(NonNull<ffi::c_void>);

// module handles are process-global and managed by the OS
unsafe impl Send for NativeRef {}
unsafe impl Sync for NativeRef {}

impl NativeRef {
	/// Returns `None` if `ptr` is null.
	#[inline]
	pub fn new(ptr: *mut ffi::c_void) -> Option<Self> {
		NonNull::new(ptr).map(Self)
	}

	#[inline]
	pub const fn as_ptr(self) -> *mut ffi::c_void {
		self.0.as_ptr()
	}
}

/// Address of an exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Address(NonNull<ffi::c_void>);

unsafe impl Send for Address {}
unsafe impl Sync for Address {}

impl Address {
	/// Returns `None` if `ptr` is null.
	#[inline]
	pub fn new(ptr: *mut ffi::c_void) -> Option<Self> {
		NonNull::new(ptr).map(Self)
	}

	#[inline]
	pub const fn as_ptr(self) -> *mut ffi::c_void {
		self.0.as_ptr()
	}
}

/// Used to specify the run-time linker used by [`Library`](crate::Library) and
/// [`LoaderSession`](crate::LoaderSession). `Backend` can also be used to make custom loaders.
///
/// Every operation touches process-global loader state. Callers are expected to serialise them;
/// [`LoaderSession`](crate::LoaderSession) does so with its lock.
///
/// # Safety
///
/// Implementors must only return addresses that stay valid until the owning
/// [`NativeRef`] is passed to [`close`](Backend::close).
pub unsafe trait Backend: Send + Sync + fmt::Debug {
	/// Short name used in diagnostics.
	fn name(&self) -> &'static str;

	/// Maps the shared library at `path` into the process.
	///
	/// # Safety
	///
	/// Loading a library runs its initialisers. The library is trusted.
	unsafe fn open(&self, path: &Path) -> Result<NativeRef, LoadError>;

	/// Looks up an exported symbol.
	///
	/// # Safety
	///
	/// `native` must have been returned by `open` on this backend and not yet closed.
	unsafe fn resolve(&self, native: NativeRef, symbol: &str) -> Result<Address, ResolveError>;

	/// Releases the library. The backend does not need to detect a double close.
	///
	/// # Safety
	///
	/// `native` must have been returned by `open` on this backend, and must not be used afterwards.
	unsafe fn close(&self, native: NativeRef) -> Result<(), UnloadError>;
}

/// Operating system the process is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
	Linux,
	Android,
	MacOs,
	Ios,
	FreeBsd,
	DragonFly,
	NetBsd,
	OpenBsd,
	Solaris,
	Illumos,
	Windows,
	/// Any other member of the unix family, loading through `dlopen`.
	Unix(&'static str),
	Other(&'static str),
}

impl Platform {
	/// Detects the platform at run-time.
	pub fn current() -> Self {
		Self::from_os_family(std::env::consts::OS, std::env::consts::FAMILY)
	}

	/// Maps a [`std::env::consts::OS`] value.
	///
	/// Names not known to be unix fall back to the family of the running build.
	pub fn from_os(os: &'static str) -> Self {
		Self::from_os_family(os, std::env::consts::FAMILY)
	}

	/// Maps a [`std::env::consts::OS`] and [`std::env::consts::FAMILY`] pair.
	pub fn from_os_family(os: &'static str, family: &str) -> Self {
		match os {
			"linux" => Self::Linux,
			"android" => Self::Android,
			"macos" => Self::MacOs,
			"ios" => Self::Ios,
			"freebsd" => Self::FreeBsd,
			"dragonfly" => Self::DragonFly,
			"netbsd" => Self::NetBsd,
			"openbsd" => Self::OpenBsd,
			"solaris" => Self::Solaris,
			"illumos" => Self::Illumos,
			"windows" => Self::Windows,
			"tvos" | "watchos" | "visionos" | "haiku" | "aix" | "hurd" | "redox" | "nto" | "emscripten"
			| "fuchsia" => Self::Unix(os),
			other if family == "unix" => Self::Unix(other),
			other => Self::Other(other),
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Linux => "linux",
			Self::Android => "android",
			Self::MacOs => "macos",
			Self::Ios => "ios",
			Self::FreeBsd => "freebsd",
			Self::DragonFly => "dragonfly",
			Self::NetBsd => "netbsd",
			Self::OpenBsd => "openbsd",
			Self::Solaris => "solaris",
			Self::Illumos => "illumos",
			Self::Windows => "windows",
			Self::Unix(os) | Self::Other(os) => os,
		}
	}

	/// Whether the platform loads libraries through `dlopen`.
	pub const fn is_dlfcn(self) -> bool {
		!matches!(self, Self::Windows | Self::Other(_))
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Selects the system backend for the platform the process is running on.
pub fn detect(config: &Config) -> Result<Arc<dyn Backend>, SessionError> {
	detect_for(Platform::current(), config)
}

/// Selects the system backend for `platform`.
///
/// Fails with [`SessionError::UnsupportedPlatform`] when no backend for `platform`
/// was compiled into this build.
pub fn detect_for(platform: Platform, config: &Config) -> Result<Arc<dyn Backend>, SessionError> {
	let backend = if platform.is_dlfcn() {
		dlfcn_backend(config)
	} else if platform == Platform::Windows {
		win32_backend(config)
	} else {
		None
	};
	backend.ok_or(SessionError::UnsupportedPlatform(platform.as_str()))
}

#[cfg(unix)]
fn dlfcn_backend(config: &Config) -> Option<Arc<dyn Backend>> {
	Some(Arc::new(crate::os::Dlfcn::new(config)))
}

#[cfg(not(unix))]
fn dlfcn_backend(_: &Config) -> Option<Arc<dyn Backend>> {
	None
}

#[cfg(windows)]
fn win32_backend(config: &Config) -> Option<Arc<dyn Backend>> {
	Some(Arc::new(crate::os::Win32::new(config)))
}

#[cfg(not(windows))]
fn win32_backend(_: &Config) -> Option<Arc<dyn Backend>> {
	None
}
