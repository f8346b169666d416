// Copyright (c) 2022 Jonathan "Razordor" Alan Thomason
//! Run-time loading of swappable native cores.
//!
//! A host picks a shared library at run-time, resolves the entry points it needs, and
//! releases the library when done, without caring which OS loader does the work:
//!
//! - [`Backend`] wraps one OS loader (`dlopen` on unix, `LoadLibraryExW` on Windows).
//!   [`backend::detect`] selects one at run-time.
//! - [`Library`] owns one loaded module.
//! - [`Symbol`] is an export bound to a function pointer type.
//! - [`LoaderSession`] holds at most one library and enforces the load/unload lifecycle.
//!
//! ```no_run
//! use coreloader::{LoaderSession, SessionError};
//!
//! let session = LoaderSession::new()?;
//! session.load("libcore.so")?;
//! let reset = session.get_method::<unsafe extern "C" fn()>("reset")?;
//! unsafe { reset.get()?() };
//! session.unload()?;
//! assert!(matches!(session.get_method::<unsafe extern "C" fn()>("reset"), Err(SessionError::NotLoaded)));
//! # Ok::<(), SessionError>(())
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backend;
pub mod config;
pub mod error;
mod library;
pub mod os;
mod resolve;
mod session;
mod sym;

pub use backend::{Address, Backend, NativeRef, Platform};
pub use config::Config;
pub use error::{LoadError, ResolveError, SessionError, UnloadError};
pub use library::Library;
pub use session::{LoaderSession, SessionState};
pub use sym::{Signature, Symbol};

/// Declares a table of entry points resolved together.
///
/// ```no_run
/// use std::ffi::c_uint;
/// use coreloader::LoaderSession;
///
/// #[coreloader::api(name = Libretro)]
/// extern "C" {
/// 	fn retro_init();
/// 	fn retro_reset();
/// 	#[link_name = "retro_api_version"]
/// 	fn api_version() -> c_uint;
/// }
///
/// let session = LoaderSession::new()?;
/// session.load("snes9x_libretro.so")?;
/// let core = Libretro::resolve(&session)?;
/// unsafe {
/// 	core.retro_init.get()?();
/// 	assert_eq!(core.api_version.get()?(), 1);
/// }
/// # Ok::<(), coreloader::SessionError>(())
/// ```
pub use coreloader_macro::api;

/// The result of a session operation.
pub type Result<T, E = SessionError> = std::result::Result<T, E>;
