mod common;

use std::sync::Arc;

use common::MockBackend;
use coreloader::*;

type AddFn = unsafe extern "C" fn(i32, i32) -> i32;

#[test]
fn test_concurrent_calls() {
	let backend = Arc::new(MockBackend::new());
	let session = LoaderSession::with_backend(backend.clone());
	session.load("libcore.so").unwrap();

	std::thread::scope(|s| {
		for i in 0..8 {
			let session = &session;
			s.spawn(move || {
				let add = session.get_method::<AddFn>("add").unwrap();
				for j in 0..1000 {
					assert_eq!(unsafe { add.get().unwrap()(i, j) }, i + j);
				}
			});
		}
	});
	session.unload().unwrap();
	assert_eq!(backend.opens(), 1);
	assert_eq!(backend.closes(), 1);
}

// load/unload racing with lookups must never leak or double release a handle
#[test]
fn test_lifecycle_race() {
	let backend = Arc::new(MockBackend::new());
	let session = LoaderSession::with_backend(backend.clone());

	std::thread::scope(|s| {
		for _ in 0..4 {
			s.spawn(|| {
				for _ in 0..200 {
					match session.load("libcore.so") {
						Ok(()) | Err(SessionError::AlreadyLoaded(_)) => {}
						Err(e) => panic!("{e}"),
					}
					match session.get_method::<AddFn>("add") {
						Ok(add) => {
							let _ = add.get();
						}
						Err(SessionError::NotLoaded) => {}
						Err(e) => panic!("{e}"),
					}
					session.unload().unwrap();
				}
			});
		}
	});
	assert_eq!(session.state(), SessionState::Empty);
	assert_eq!(backend.opens(), backend.closes());
	assert_eq!(backend.live(), 0);
}

#[test]
fn test_symbol_send() {
	let backend = Arc::new(MockBackend::new());
	let session = LoaderSession::with_backend(backend);
	session.load("libcore.so").unwrap();
	let add = session.get_method::<AddFn>("add").unwrap();

	let t = std::thread::spawn(move || unsafe { add.get().unwrap()(40, 2) });
	assert_eq!(t.join().unwrap(), 42);
}
