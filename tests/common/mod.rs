// An in-process backend whose "libraries" export plain Rust functions.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use coreloader::{Address, Backend, LoadError, NativeRef, ResolveError, UnloadError};
use parking_lot::Mutex;

thread_local! {
	static RESETS: Cell<usize> = Cell::new(0);
}

pub extern "C" fn reset() {
	RESETS.with(|count| count.set(count.get() + 1));
}

pub extern "C" fn add(a: i32, b: i32) -> i32 {
	a + b
}

pub extern "C" fn version() -> u32 {
	7
}

/// How many times `reset` ran on the current thread.
pub fn resets() -> usize {
	RESETS.with(Cell::get)
}

fn addr(f: *const ()) -> Address {
	Address::new(f as *mut ffi::c_void).unwrap()
}

#[derive(Debug, Default)]
pub struct MockBackend {
	files: HashMap<PathBuf, Vec<(&'static str, Address)>>,
	broken: Vec<PathBuf>,
	open: Mutex<HashMap<usize, PathBuf>>,
	next: AtomicUsize,
	fail_close: bool,
	pub opens: AtomicUsize,
	pub closes: AtomicUsize,
}

impl MockBackend {
	/// `libcore.so` exports `reset`, `add` and `version`; `libother.so` only `version`;
	/// `garbage.so` exists but is not a library.
	pub fn new() -> Self {
		let mut files = HashMap::new();
		files.insert(
			PathBuf::from("libcore.so"),
			vec![
				("reset", addr(reset as *const ())),
				("add", addr(add as *const ())),
				("version", addr(version as *const ())),
			],
		);
		files.insert(PathBuf::from("libother.so"), vec![("version", addr(version as *const ()))]);
		Self {
			files,
			broken: vec![PathBuf::from("garbage.so")],
			..Self::default()
		}
	}

	pub fn failing_close() -> Self {
		Self {
			fail_close: true,
			..Self::new()
		}
	}

	pub fn opens(&self) -> usize {
		self.opens.load(Ordering::SeqCst)
	}

	pub fn closes(&self) -> usize {
		self.closes.load(Ordering::SeqCst)
	}

	/// Libraries currently mapped.
	pub fn live(&self) -> usize {
		self.open.lock().len()
	}
}

unsafe impl Backend for MockBackend {
	fn name(&self) -> &'static str {
		"mock"
	}

	unsafe fn open(&self, path: &Path) -> Result<NativeRef, LoadError> {
		if self.broken.iter().any(|p| p == path) {
			return Err(LoadError::FormatInvalid {
				path: path.to_owned(),
				message: "invalid ELF header".to_owned(),
			});
		}
		if !self.files.contains_key(path) {
			return Err(LoadError::NotFound { path: path.to_owned() });
		}
		let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
		self.open.lock().insert(id, path.to_owned());
		self.opens.fetch_add(1, Ordering::SeqCst);
		Ok(NativeRef::new(id as *mut ffi::c_void).unwrap())
	}

	unsafe fn resolve(&self, native: NativeRef, symbol: &str) -> Result<Address, ResolveError> {
		let open = self.open.lock();
		let path = open
			.get(&(native.as_ptr() as usize))
			.expect("resolve against a handle that is not open");
		self.files[path]
			.iter()
			.find(|(name, _)| *name == symbol)
			.map(|(_, addr)| *addr)
			.ok_or_else(|| ResolveError::SymbolNotFound(symbol.to_owned()))
	}

	unsafe fn close(&self, native: NativeRef) -> Result<(), UnloadError> {
		self.closes.fetch_add(1, Ordering::SeqCst);
		let removed = self.open.lock().remove(&(native.as_ptr() as usize));
		assert!(removed.is_some(), "handle released twice");
		if self.fail_close {
			Err(UnloadError::OsSpecific {
				code: Some(16),
				message: "device or resource busy".to_owned(),
			})
		} else {
			Ok(())
		}
	}
}
