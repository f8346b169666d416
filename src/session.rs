// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{self, Backend};
use crate::config::Config;
use crate::error::SessionError;
use crate::library::Library;
use crate::sym::{Signature, Symbol};

/// Observable lifecycle state of a [`LoaderSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Empty,
	Loaded,
	/// The backend is releasing the library.
	Closing,
	/// Terminal; nothing can be loaded any more.
	ShutDown,
}

#[derive(Debug)]
enum State {
	Empty,
	Loaded(Library),
	Closing,
	ShutDown,
}

impl State {
	fn kind(&self) -> SessionState {
		match self {
			Self::Empty => SessionState::Empty,
			Self::Loaded(_) => SessionState::Loaded,
			Self::Closing => SessionState::Closing,
			Self::ShutDown => SessionState::ShutDown,
		}
	}
}

/// Owns the currently active core for a host.
///
/// At most one library is loaded at a time: [`load`](LoaderSession::load) refuses to replace
/// a loaded library, the caller must [`unload`](LoaderSession::unload) first. Dropping the
/// session shuts it down, releasing any library that is still loaded.
///
/// State checks and transitions are serialised by one lock, which also serialises the
/// backend calls. Calls made through resolved [`Symbol`]s never take the lock.
///
/// # Examples
///
/// ```no_run
/// use coreloader::{LoaderSession, SessionState};
///
/// let session = LoaderSession::new()?;
/// session.load("libcore.so")?;
/// let reset = session.get_method::<unsafe extern "C" fn()>("retro_reset")?;
/// unsafe { reset.get()?() };
/// session.unload()?;
/// assert_eq!(session.state(), SessionState::Empty);
/// # Ok::<(), coreloader::SessionError>(())
/// ```
#[derive(Debug)]
pub struct LoaderSession {
	backend: Arc<dyn Backend>,
	state: Mutex<State>,
}

impl LoaderSession {
	/// Creates a session backed by the system loader of the running platform.
	///
	/// # Errors
	///
	/// [`SessionError::UnsupportedPlatform`] if no backend exists for this platform.
	pub fn new() -> Result<Self, SessionError> {
		Self::with_config(&Config::default())
	}

	/// Like [`new`](LoaderSession::new), with explicit backend options.
	pub fn with_config(config: &Config) -> Result<Self, SessionError> {
		backend::detect(config).map(Self::with_backend)
	}

	pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
		Self {
			backend,
			state: Mutex::new(State::Empty),
		}
	}

	#[inline]
	pub fn backend_name(&self) -> &'static str {
		self.backend.name()
	}

	pub fn state(&self) -> SessionState {
		self.state.lock().kind()
	}

	/// Path of the currently loaded library.
	pub fn loaded_path(&self) -> Option<PathBuf> {
		match &*self.state.lock() {
			State::Loaded(library) => Some(library.path().to_owned()),
			_ => None,
		}
	}

	/// Loads the library at `path` and makes it the active one.
	///
	/// A failed load leaves the session empty.
	///
	/// # Errors
	///
	/// - [`SessionError::AlreadyLoaded`] if a library is loaded; the loaded one is kept.
	/// - [`SessionError::ShutDown`] after [`shutdown`](LoaderSession::shutdown).
	/// - [`SessionError::Load`] with the backend's reason otherwise.
	pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<(), SessionError> {
		let path = path.as_ref();
		let mut state = self.state.lock();
		match &*state {
			State::Loaded(library) => return Err(SessionError::AlreadyLoaded(library.path().to_owned())),
			State::ShutDown => return Err(SessionError::ShutDown),
			State::Empty | State::Closing => {}
		}
		let library = Library::open(Arc::clone(&self.backend), path)?;
		*state = State::Loaded(library);
		tracing::debug!(path = %path.display(), "session loaded");
		Ok(())
	}

	/// Resolves `name` from the loaded library, bound to the signature `F`.
	///
	/// The loader cannot verify that the export matches `F`. Calling a symbol
	/// through the wrong signature is undefined behaviour.
	///
	/// # Errors
	///
	/// - [`SessionError::NotLoaded`] if nothing is loaded.
	/// - [`SessionError::ShutDown`] after [`shutdown`](LoaderSession::shutdown).
	/// - [`SessionError::Resolve`] if the library has no such export.
	pub fn get_method<F: Signature>(&self, name: &str) -> Result<Symbol<F>, SessionError> {
		match &*self.state.lock() {
			State::Loaded(library) => Ok(library.symbol(name)?),
			State::ShutDown => Err(SessionError::ShutDown),
			State::Empty | State::Closing => Err(SessionError::NotLoaded),
		}
	}

	/// Releases the loaded library. Does nothing if no library is loaded.
	///
	/// # Errors
	///
	/// [`SessionError::Unload`] if the OS refused to release the library. The session
	/// is empty afterwards regardless, and the release is not retried.
	pub fn unload(&self) -> Result<(), SessionError> {
		unload_locked(&mut self.state.lock())
	}

	/// Moves the session to its terminal state, unloading the library if one is loaded.
	///
	/// Calling it again does nothing.
	pub fn shutdown(&self) -> Result<(), SessionError> {
		let mut state = self.state.lock();
		let result = unload_locked(&mut state);
		if !matches!(*state, State::ShutDown) {
			tracing::debug!("session shut down");
		}
		*state = State::ShutDown;
		result
	}
}

fn unload_locked(state: &mut State) -> Result<(), SessionError> {
	let library = match mem::replace(state, State::Closing) {
		State::Loaded(library) => library,
		// only reachable if a backend panicked mid-close; the library is already gone
		State::Closing | State::Empty => {
			*state = State::Empty;
			return Ok(());
		}
		State::ShutDown => {
			*state = State::ShutDown;
			return Ok(());
		}
	};
	let result = library.close();
	*state = State::Empty;
	tracing::debug!(ok = result.is_ok(), "session unloaded");
	Ok(result?)
}

impl Drop for LoaderSession {
	fn drop(&mut self) {
		if let Err(err) = self.shutdown() {
			tracing::warn!(%err, "failed to release library during session teardown");
		}
	}
}
