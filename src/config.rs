// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

/// When the dynamic linker resolves a library's undefined symbols.
///
/// Maps to `RTLD_NOW` / `RTLD_LAZY`. Windows always binds eagerly, so this is ignored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
	#[default]
	Now,
	Lazy,
}

/// Whether a library's exports are made available to libraries loaded after it.
///
/// Maps to `RTLD_LOCAL` / `RTLD_GLOBAL`. Ignored on Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
	#[default]
	Local,
	Global,
}

/// Directories `LoadLibraryExW` searches. Ignored on unix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DllSearch {
	/// The standard search order (flags = `0`).
	#[default]
	System,
	/// `LOAD_LIBRARY_SEARCH_DEFAULT_DIRS | LOAD_LIBRARY_SAFE_CURRENT_DIRS`
	DefaultDirs,
}

/// Options handed to a backend when it is constructed.
///
/// # Examples
///
/// ```
/// use coreloader::config::{Binding, Config, Scope};
///
/// let config = Config::new().binding(Binding::Lazy).scope(Scope::Global);
/// assert_eq!(config.binding, Binding::Lazy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	pub binding: Binding,
	pub scope: Scope,
	pub search: DllSearch,
	/// Suppress the Windows "missing dll" dialog box while loading.
	pub quiet_errors: bool,
}

impl Config {
	pub const fn new() -> Self {
		Self {
			binding: Binding::Now,
			scope: Scope::Local,
			search: DllSearch::System,
			quiet_errors: true,
		}
	}

	pub const fn binding(mut self, binding: Binding) -> Self {
		self.binding = binding;
		self
	}

	pub const fn scope(mut self, scope: Scope) -> Self {
		self.scope = scope;
		self
	}

	pub const fn search(mut self, search: DllSearch) -> Self {
		self.search = search;
		self
	}

	pub const fn quiet_errors(mut self, quiet: bool) -> Self {
		self.quiet_errors = quiet;
		self
	}
}

impl Default for Config {
	fn default() -> Self {
		Self::new()
	}
}
