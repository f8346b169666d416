// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

//! System backends. Only the backends for the target family are compiled in;
//! [`detect`](crate::backend::detect) picks between them at run-time.

#[cfg_attr(docsrs, doc(cfg(unix)))]
#[cfg(unix)]
pub mod unix;
#[cfg_attr(docsrs, doc(cfg(windows)))]
#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub use unix::{Dlfcn, Process};
#[cfg(windows)]
pub use windows::{Process, Win32};
