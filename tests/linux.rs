#![cfg(target_os = "linux")]

use std::ffi::{c_char, c_int};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use coreloader::config::{Binding, Scope};
use coreloader::*;

// A scratch file that is removed again when the test ends.
struct TempFile(PathBuf);

impl TempFile {
	fn new(name: &str, contents: &[u8]) -> Self {
		let path = std::env::temp_dir().join(format!("coreloader-{}-{name}", std::process::id()));
		let mut file = std::fs::File::create(&path).unwrap();
		file.write_all(contents).unwrap();
		Self(path)
	}
}

impl Drop for TempFile {
	fn drop(&mut self) {
		let _ = std::fs::remove_file(&self.0);
	}
}

#[test]
fn test_libm_cos() {
	let session = LoaderSession::new().unwrap();
	assert_eq!(session.backend_name(), "dlfcn");
	session.load("libm.so.6").unwrap();

	let cos = session.get_method::<unsafe extern "C" fn(f64) -> f64>("cos").unwrap();
	assert_eq!(unsafe { cos.get().unwrap()(0.0) }, 1.0);
	session.unload().unwrap();
	assert!(!cos.is_live());
}

#[test]
fn test_missing_library() {
	let session = LoaderSession::new().unwrap();
	match session.load("/nonexistent/dir/libcore.so") {
		Err(SessionError::Load(LoadError::NotFound { path })) => {
			assert_eq!(path, Path::new("/nonexistent/dir/libcore.so"))
		}
		other => panic!("unexpected result: {other:?}"),
	}
	let err = session.load("libcoreloader_missing_core.so").unwrap_err();
	assert!(matches!(err, SessionError::Load(LoadError::NotFound { .. })), "{err}");
	assert!(matches!(session.load(""), Err(SessionError::Load(LoadError::NotFound { .. }))));
	assert_eq!(session.state(), SessionState::Empty);
}

#[test]
fn test_unreachable_paths() {
	let session = LoaderSession::new().unwrap();

	// a path component that is a regular file
	let err = session.load("/etc/passwd/libcore.so").unwrap_err();
	match &err {
		SessionError::Load(err @ LoadError::NotFound { .. }) => assert_eq!(err.code(), None),
		other => panic!("unexpected error: {other}"),
	}

	let long = std::env::temp_dir().join(format!("{}.so", "x".repeat(300)));
	let err = session.load(&long).unwrap_err();
	assert!(matches!(err, SessionError::Load(LoadError::NotFound { .. })), "{err}");
	assert_eq!(session.state(), SessionState::Empty);
}

#[test]
fn test_directory_error_code() {
	let session = LoaderSession::new().unwrap();
	// fail once first so a leftover errno would show up in the next error
	assert!(session.load("/etc/passwd/libcore.so").is_err());

	match session.load(std::env::temp_dir()) {
		Err(SessionError::Load(LoadError::OsSpecific { code, .. })) => assert_eq!(code, Some(libc::EISDIR)),
		other => panic!("unexpected result: {other:?}"),
	}
}

#[test]
fn test_invalid_format() {
	let garbage = TempFile::new("garbage.so", &[0x5a; 256]);
	let session = LoaderSession::new().unwrap();
	match session.load(&garbage.0) {
		Err(SessionError::Load(LoadError::FormatInvalid { path, message })) => {
			assert_eq!(path, garbage.0);
			assert!(!message.is_empty());
		}
		other => panic!("unexpected result: {other:?}"),
	}
}

#[test]
fn test_permission_denied() {
	use std::os::unix::fs::PermissionsExt;

	// root ignores file modes
	if unsafe { libc::geteuid() } == 0 {
		return;
	}
	let locked = TempFile::new("locked.so", &[0x5a; 256]);
	std::fs::set_permissions(&locked.0, std::fs::Permissions::from_mode(0o000)).unwrap();

	let session = LoaderSession::new().unwrap();
	let err = session.load(&locked.0).unwrap_err();
	assert!(matches!(err, SessionError::Load(LoadError::PermissionDenied { .. })), "{err}");
}

#[test]
fn test_missing_symbol() {
	let session = LoaderSession::new().unwrap();
	session.load("libm.so.6").unwrap();
	match session.get_method::<unsafe extern "C" fn()>("retro_run") {
		Err(SessionError::Resolve(ResolveError::SymbolNotFound(name))) => assert_eq!(name, "retro_run"),
		other => panic!("unexpected result: {other:?}"),
	}
	let err = session.get_method::<unsafe extern "C" fn()>("co\0s").unwrap_err();
	assert!(matches!(err, SessionError::Resolve(ResolveError::SymbolNotFound(_))));
}

#[test]
fn test_process_atoi() {
	let backend = Arc::new(os::Process::new(&Config::default()));
	let lib = Library::open(backend, "").unwrap();
	assert_eq!(lib.backend().name(), "process");

	let atoi = lib.symbol::<unsafe extern "C-unwind" fn(*const c_char) -> c_int>("atoi").unwrap();
	let five = unsafe { atoi.get().unwrap()(b"5\0".as_ptr().cast()) };
	assert_eq!(five, 5);
	lib.close().unwrap();
}

#[test]
fn test_dlfcn_flags() {
	let dlfcn = os::Dlfcn::new(&Config::default());
	assert_eq!(dlfcn.flags(), libc::RTLD_NOW | libc::RTLD_LOCAL);

	let dlfcn = os::Dlfcn::new(&Config::new().binding(Binding::Lazy).scope(Scope::Global));
	assert_eq!(dlfcn.flags(), libc::RTLD_LAZY | libc::RTLD_GLOBAL);

	let session = LoaderSession::with_backend(Arc::new(dlfcn));
	session.load("libm.so.6").unwrap();
	assert!(session.get_method::<unsafe extern "C" fn(f64) -> f64>("sqrt").is_ok());
}

#[test]
fn test_reload() {
	let session = LoaderSession::new().unwrap();
	for _ in 0..16 {
		session.load("libm.so.6").unwrap();
		let floor = session.get_method::<unsafe extern "C" fn(f64) -> f64>("floor").unwrap();
		assert_eq!(unsafe { floor.get().unwrap()(2.5) }, 2.0);
		session.unload().unwrap();
	}
}
