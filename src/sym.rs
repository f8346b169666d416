// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::{fmt, sync::Weak};

use crate::error::ResolveError;
use crate::library::Shared;

/// Call signature a resolved symbol is bound to.
///
/// Implemented for `unsafe extern` function pointers with the `"C"`, `"system"`, `"C-unwind"`
/// and `"system-unwind"` ABIs, taking up to 12 arguments. Only `unsafe` pointer types are
/// accepted, so every call through a [`Symbol`] happens inside an `unsafe` block where the
/// caller vouches for the signature.
///
/// # Safety
///
/// Implementors must be function pointer types, the same size as a data pointer.
pub unsafe trait Signature: Copy + Send + Sync + 'static {}

macro_rules! impl_signature {
	($($arg:ident),*) => {
		unsafe impl<R: 'static, $($arg: 'static),*> Signature for unsafe extern "C" fn($($arg),*) -> R {}
		unsafe impl<R: 'static, $($arg: 'static),*> Signature for unsafe extern "system" fn($($arg),*) -> R {}
		unsafe impl<R: 'static, $($arg: 'static),*> Signature for unsafe extern "C-unwind" fn($($arg),*) -> R {}
		unsafe impl<R: 'static, $($arg: 'static),*> Signature for unsafe extern "system-unwind" fn($($arg),*) -> R {}
	};
}

impl_signature!();
impl_signature!(A);
impl_signature!(A, B);
impl_signature!(A, B, C);
impl_signature!(A, B, C, D);
impl_signature!(A, B, C, D, E);
impl_signature!(A, B, C, D, E, F);
impl_signature!(A, B, C, D, E, F, G);
impl_signature!(A, B, C, D, E, F, G, H);
impl_signature!(A, B, C, D, E, F, G, H, I);
impl_signature!(A, B, C, D, E, F, G, H, I, J);
impl_signature!(A, B, C, D, E, F, G, H, I, J, K);
impl_signature!(A, B, C, D, E, F, G, H, I, J, K, L);

/// A function resolved from a [`Library`](crate::Library).
///
/// A `Symbol` does not keep its library loaded. Once the library is released,
/// [`get`](Symbol::get) refuses to hand out the function pointer.
///
/// # Examples
///
/// ```no_run
/// use coreloader::{LoaderSession, Symbol};
///
/// let session = LoaderSession::new()?;
/// session.load("libcore.so")?;
/// let reset: Symbol<unsafe extern "C" fn()> = session.get_method("retro_reset")?;
/// unsafe { reset.get()?() };
/// # Ok::<(), coreloader::SessionError>(())
/// ```
#[derive(Clone)]
pub struct Symbol<F: Signature> {
	func: F,
	name: Box<str>,
	owner: Weak<Shared>,
}

impl<F: Signature> Symbol<F> {
	pub(crate) fn new(func: F, name: &str, owner: Weak<Shared>) -> Self {
		Self {
			func,
			name: name.into(),
			owner,
		}
	}

	/// The exported name this symbol was resolved from.
	#[inline]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns `true` while the owning library is still loaded.
	pub fn is_live(&self) -> bool {
		self.owner.upgrade().map_or(false, |shared| shared.is_live())
	}

	/// Returns the function pointer if the owning library is still loaded.
	///
	/// The check only covers the moment of the call: releasing the library while the
	/// returned pointer is in use is still the caller's responsibility.
	///
	/// # Errors
	///
	/// [`ResolveError::HandleNotLive`] once the library has been released.
	pub fn get(&self) -> Result<F, ResolveError> {
		if self.is_live() {
			Ok(self.func)
		} else {
			Err(ResolveError::HandleNotLive(self.name.to_string()))
		}
	}

	/// Returns the function pointer without checking the owning library.
	///
	/// # Safety
	///
	/// The owning library must still be loaded when the pointer is called.
	#[inline]
	pub unsafe fn get_unchecked(&self) -> F {
		self.func
	}
}

impl<F: Signature> fmt::Debug for Symbol<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Symbol")
			.field("name", &self.name)
			.field("live", &self.is_live())
			.finish()
	}
}
