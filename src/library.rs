// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::backend::{Backend, NativeRef};
use crate::error::{LoadError, ResolveError, UnloadError};
use crate::resolve;
use crate::sym::{Signature, Symbol};

// State shared with every `Symbol` resolved from the library.
#[derive(Debug)]
pub(crate) struct Shared {
	native: NativeRef,
	path: PathBuf,
	live: AtomicBool,
}

impl Shared {
	#[inline]
	pub(crate) fn is_live(&self) -> bool {
		self.live.load(Ordering::Acquire)
	}
}

/// An object providing access to an open shared library.
///
/// The library is released by [`close`](Library::close), or when the `Library` is dropped.
/// The OS handle is released at most once either way.
#[derive(Debug)]
pub struct Library {
	shared: Arc<Shared>,
	backend: Arc<dyn Backend>,
}

impl Library {
	/// Attempts to open a shared library through `backend`.
	///
	/// Loading runs the library's initialisers; the library is trusted.
	///
	/// # Errors
	///
	/// Returns the [`LoadError`] reported by the backend.
	///
	/// # Examples
	///
	/// ```no_run
	/// use coreloader::{backend, config::Config, Library};
	///
	/// let backend = backend::detect(&Config::default())?;
	/// let lib = Library::open(backend, "libcore.so")?;
	/// assert!(lib.is_live());
	/// # Ok::<(), Box<dyn std::error::Error>>(())
	/// ```
	pub fn open<P: AsRef<Path>>(backend: Arc<dyn Backend>, path: P) -> Result<Self, LoadError> {
		let path = path.as_ref();
		let native = unsafe { backend.open(path)? };
		tracing::debug!(path = %path.display(), backend = backend.name(), "library opened");
		Ok(Self {
			shared: Arc::new(Shared {
				native,
				path: path.to_owned(),
				live: AtomicBool::new(true),
			}),
			backend,
		})
	}

	/// The path the library was opened from.
	#[inline]
	pub fn path(&self) -> &Path {
		&self.shared.path
	}

	#[inline]
	pub fn is_live(&self) -> bool {
		self.shared.is_live()
	}

	/// The backend that opened this library.
	#[inline]
	pub fn backend(&self) -> &dyn Backend {
		&*self.backend
	}

	/// The raw OS handle.
	#[inline]
	pub fn as_raw(&self) -> NativeRef {
		self.shared.native
	}

	/// Resolves `name` and binds it to the signature `F`.
	///
	/// The loader cannot check that the export really has the signature `F`;
	/// see [`Signature`] for the contract the caller takes on.
	///
	/// # Errors
	///
	/// [`ResolveError::SymbolNotFound`] if the library has no such export.
	pub fn symbol<F: Signature>(&self, name: &str) -> Result<Symbol<F>, ResolveError> {
		resolve::resolve(self, name)
	}

	/// Releases the library and invalidates every [`Symbol`] resolved from it.
	///
	/// # Errors
	///
	/// May error depending on system call. The library counts as released either way.
	pub fn close(self) -> Result<(), UnloadError> {
		self.release()
	}

	#[inline]
	pub(crate) fn downgrade(&self) -> Weak<Shared> {
		Arc::downgrade(&self.shared)
	}

	fn release(&self) -> Result<(), UnloadError> {
		if self.shared.live.swap(false, Ordering::AcqRel) {
			tracing::debug!(path = %self.path().display(), backend = self.backend.name(), "library closed");
			unsafe { self.backend.close(self.shared.native) }
		} else {
			Ok(())
		}
	}
}

impl Drop for Library {
	fn drop(&mut self) {
		if let Err(err) = self.release() {
			tracing::warn!(path = %self.path().display(), %err, "failed to release library on drop");
		}
	}
}
