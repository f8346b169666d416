// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::{ffi, marker::PhantomData, mem};

use crate::backend::Address;
use crate::error::ResolveError;
use crate::library::Library;
use crate::sym::{Signature, Symbol};

struct AssertPointerSized<F>(PhantomData<F>);

impl<F> AssertPointerSized<F> {
	const OK: () = assert!(mem::size_of::<F>() == mem::size_of::<*mut ffi::c_void>());
}

pub(crate) fn resolve<F: Signature>(library: &Library, name: &str) -> Result<Symbol<F>, ResolveError> {
	// backends differ in whether they notice a closed handle, so check here
	if !library.is_live() {
		return Err(ResolveError::HandleNotLive(name.to_owned()));
	}
	let addr = unsafe { library.backend().resolve(library.as_raw(), name)? };
	tracing::trace!(symbol = name, address = ?addr.as_ptr(), "symbol resolved");
	Ok(Symbol::new(unsafe { bind::<F>(addr) }, name, library.downgrade()))
}

// The only place an untyped address becomes a typed function pointer. Nothing here can
// check the export against `F`; a mismatch is undefined behaviour at call time.
#[inline]
unsafe fn bind<F: Signature>(addr: Address) -> F {
	#[allow(clippy::let_unit_value)]
	let () = AssertPointerSized::<F>::OK;
	mem::transmute_copy::<*mut ffi::c_void, F>(&addr.as_ptr())
}
