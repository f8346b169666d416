// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::path::PathBuf;
use thiserror::Error;

/// Failure to map a shared library into the process.
#[derive(Debug, Error)]
pub enum LoadError {
	#[error("library `{}` not found", .path.display())]
	NotFound { path: PathBuf },
	#[error("library `{}` is not a loadable image: {message}", .path.display())]
	FormatInvalid { path: PathBuf, message: String },
	#[error("permission denied while loading `{}`", .path.display())]
	PermissionDenied { path: PathBuf },
	#[error("failed to load `{}` (code {code:?}): {message}", .path.display())]
	OsSpecific {
		path: PathBuf,
		code: Option<i32>,
		message: String,
	},
}

impl LoadError {
	/// The path that was handed to the loader.
	pub fn path(&self) -> &std::path::Path {
		match self {
			Self::NotFound { path }
			| Self::FormatInvalid { path, .. }
			| Self::PermissionDenied { path }
			| Self::OsSpecific { path, .. } => path,
		}
	}

	/// Raw OS error code, if the platform reported one.
	pub fn code(&self) -> Option<i32> {
		match self {
			Self::OsSpecific { code, .. } => *code,
			_ => None,
		}
	}
}

/// Failure to turn a symbol name into a callable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
	#[error("function `{0}` not found")]
	SymbolNotFound(String),
	#[error("function `{0}` belongs to a library that has been released")]
	HandleNotLive(String),
}

impl ResolveError {
	pub fn symbol(&self) -> &str {
		match self {
			Self::SymbolNotFound(name) | Self::HandleNotLive(name) => name,
		}
	}
}

/// Failure reported by the OS while releasing a library.
#[derive(Debug, Error)]
pub enum UnloadError {
	#[error("failed to release library (code {code:?}): {message}")]
	OsSpecific { code: Option<i32>, message: String },
}

/// Errors produced by [`LoaderSession`](crate::LoaderSession).
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("a library is already loaded from `{}`; unload it first", .0.display())]
	AlreadyLoaded(PathBuf),
	#[error("no library is loaded")]
	NotLoaded,
	#[error("session has been shut down")]
	ShutDown,
	#[error("no loader backend available for platform `{0}`")]
	UnsupportedPlatform(&'static str),
	#[error(transparent)]
	Load(#[from] LoadError),
	#[error(transparent)]
	Resolve(#[from] ResolveError),
	#[error(transparent)]
	Unload(#[from] UnloadError),
}
